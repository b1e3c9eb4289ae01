use clap::Args;
use mbserve_core::{ExceptionCode, ModbusCommand, ResolveError};
use mbserve_server::ServerConfig;
use std::net::{IpAddr, Ipv4Addr};
use tracing::warn;

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    #[arg(long, default_value_t = 502)]
    pub port: u16,
    /// Report addresses in Modicon ranges (40001.., 30001.., ...) instead of raw offsets.
    #[arg(long)]
    pub modicon_addressing: bool,
    /// Acknowledge every write without waiting for the handler.
    #[arg(long)]
    pub auto_respond: bool,
}

impl ServerArgs {
    pub fn config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_bind_host(self.host)
            .with_simple_addressing(!self.modicon_addressing)
            .with_auto_respond_success(self.auto_respond)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

/// Repeats `pattern` until `len` values are produced.
pub fn fill_from_pattern<T: Copy>(pattern: &[T], len: usize) -> Vec<T> {
    pattern.iter().copied().cycle().take(len).collect()
}

/// Turns a read `success` that could not be encoded into an `IllegalDataValue` exception.
///
/// The decoder accepts any quantity, but a read reply has a one-byte byte count,
/// so counts above 2040 coils or 127 registers can only be refused.
pub fn refuse_unencodable_read<C: ModbusCommand>(
    cmd: &mut C,
    answered: Result<(), ResolveError>,
) -> Result<(), ResolveError> {
    match answered {
        Err(ResolveError::Encode(err)) => {
            warn!(
                transaction_id = cmd.transaction_id(),
                function = cmd.function_code().as_u8(),
                error = %err,
                "requested quantity does not fit a reply"
            );
            cmd.fail(ExceptionCode::IllegalDataValue)
        }
        other => other,
    }
}
