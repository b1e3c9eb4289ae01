use std::net::{IpAddr, Ipv4Addr};

use mbserve_core::frame::tcp::MAX_ADU_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Keep protocol offsets as-is instead of shifting them into Modicon ranges.
    pub simple_addressing: bool,
    /// Resolve write commands with their echo response before they are dispatched.
    pub auto_respond_success: bool,
    pub bind_host: IpAddr,
    /// Largest accepted frame, MBAP header included.
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            simple_addressing: true,
            auto_respond_success: false,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            max_frame_len: MAX_ADU_LEN,
        }
    }
}

impl ServerConfig {
    pub fn with_simple_addressing(mut self, simple_addressing: bool) -> Self {
        self.simple_addressing = simple_addressing;
        self
    }

    pub fn with_auto_respond_success(mut self, auto_respond_success: bool) -> Self {
        self.auto_respond_success = auto_respond_success;
        self
    }

    pub fn with_bind_host(mut self, bind_host: IpAddr) -> Self {
        self.bind_host = bind_host;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}
