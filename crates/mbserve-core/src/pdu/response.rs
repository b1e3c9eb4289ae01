//! Success-path response encoders.
//!
//! Every encoder takes the full request frame so that transaction id,
//! protocol id, unit id and function code are mirrored from the request.

use alloc::vec;
use alloc::vec::Vec;

use crate::encoding::{Reader, Writer};
use crate::frame::tcp::{MbapHeader, MBAP_HEADER_LEN, MIN_REQUEST_LEN};
use crate::EncodeError;

/// Length field of an FC15/FC16 reply: unit id, function code, start, quantity.
const FIXED_ECHO_LENGTH: u16 = 6;

fn request_head(request: &[u8]) -> Result<(MbapHeader, u8), EncodeError> {
    let mut r = Reader::new(request);
    let header = MbapHeader::decode(&mut r).map_err(|_| EncodeError::ValueOutOfRange)?;
    let function = r.read_u8().map_err(|_| EncodeError::ValueOutOfRange)?;
    Ok((header, function))
}

/// Packs `values` least-significant bit first; trailing bits of the last byte stay zero.
pub fn pack_bits(values: &[bool], out: &mut [u8]) {
    out.fill(0);
    for (i, value) in values.iter().enumerate() {
        if *value {
            out[i / 8] |= 1u8 << (i % 8);
        }
    }
}

/// Inverse of [`pack_bits`], truncated to `count` entries.
pub fn unpack_bits(packed: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| packed.get(i / 8).is_some_and(|byte| byte & (1u8 << (i % 8)) != 0))
        .collect()
}

/// FC01/FC02 reply: byte count followed by the packed bits.
pub fn encode_bit_response(request: &[u8], values: &[bool]) -> Result<Vec<u8>, EncodeError> {
    let (header, function) = request_head(request)?;
    let byte_count = values.len().div_ceil(8);
    let byte_count_u8 = u8::try_from(byte_count).map_err(|_| EncodeError::ValueOutOfRange)?;

    let mut packed = vec![0u8; byte_count];
    pack_bits(values, &mut packed);

    let mut w = Writer::with_limit(MBAP_HEADER_LEN + 2 + byte_count);
    header.reply(2 + byte_count)?.encode(&mut w)?;
    w.write_u8(function)?;
    w.write_u8(byte_count_u8)?;
    w.write_all(&packed)?;
    Ok(w.into_frame())
}

/// FC03/FC04 reply: byte count followed by big-endian registers.
pub fn encode_register_response(request: &[u8], values: &[u16]) -> Result<Vec<u8>, EncodeError> {
    let (header, function) = request_head(request)?;
    let byte_count = values.len() * 2;
    let byte_count_u8 = u8::try_from(byte_count).map_err(|_| EncodeError::ValueOutOfRange)?;

    let mut w = Writer::with_limit(MBAP_HEADER_LEN + 2 + byte_count);
    header.reply(2 + byte_count)?.encode(&mut w)?;
    w.write_u8(function)?;
    w.write_u8(byte_count_u8)?;
    for value in values {
        w.write_be_u16(*value)?;
    }
    Ok(w.into_frame())
}

/// FC05/FC06 reply: the request, verbatim.
pub fn encode_echo(request: &[u8]) -> Vec<u8> {
    request.to_vec()
}

/// FC15/FC16 reply: the first twelve request bytes with the length forced to six.
pub fn encode_fixed_echo(request: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let head = request
        .get(..MIN_REQUEST_LEN)
        .ok_or(EncodeError::ValueOutOfRange)?;
    let (header, _) = request_head(head)?;

    let mut w = Writer::with_limit(MIN_REQUEST_LEN);
    MbapHeader {
        length: FIXED_ECHO_LENGTH,
        ..header
    }
    .encode(&mut w)?;
    w.write_all(&head[MBAP_HEADER_LEN..])?;
    Ok(w.into_frame())
}

#[cfg(test)]
mod tests {
    use super::{
        encode_bit_response, encode_echo, encode_fixed_echo, encode_register_response, pack_bits,
        unpack_bits,
    };
    use crate::EncodeError;
    use alloc::vec;

    const READ_COILS: [u8; 12] = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x05, 0x01, 0x00, 0x00, 0x00, 0x0A];

    #[test]
    fn packs_lsb_first() {
        let mut out = [0xFFu8; 2];
        pack_bits(&[true, false, true, true, false, false, true, false, true], &mut out);
        assert_eq!(out, [0b0100_1101, 0b0000_0001]);
    }

    #[test]
    fn unpack_truncates_to_count() {
        let values = unpack_bits(&[0xCD, 0x01], 10);
        assert_eq!(
            values,
            vec![true, false, true, true, false, false, true, true, true, false]
        );
        assert_eq!(unpack_bits(&[0xFF], 12).len(), 12);
    }

    #[test]
    fn bit_response_pads_to_byte_boundary() {
        let values = [true, true, false, false, false, false, false, false, false, true];
        let frame = encode_bit_response(&READ_COILS, &values).unwrap();
        assert_eq!(
            frame,
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x05, 0x01, 0x02, 0x03, 0x02]
        );
    }

    #[test]
    fn register_response_is_big_endian() {
        let request = [0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x02];
        let frame = encode_register_response(&request, &[0x1234, 0xABCD]).unwrap();
        assert_eq!(
            frame,
            vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x07, 0x01, 0x04, 0x04, 0x12, 0x34, 0xAB, 0xCD]
        );
    }

    #[test]
    fn register_byte_count_must_fit_one_byte() {
        let values = vec![0u16; 128];
        assert_eq!(
            encode_register_response(&READ_COILS, &values).unwrap_err(),
            EncodeError::ValueOutOfRange
        );
    }

    #[test]
    fn echo_copies_request() {
        assert_eq!(encode_echo(&READ_COILS), READ_COILS.to_vec());
    }

    #[test]
    fn fixed_echo_truncates_and_sets_length() {
        let request = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x08, 0x05, 0x0F, 0x01, 0x10, 0x00, 0x0A, 0x02, 0xCD, 0x01,
        ];
        assert_eq!(
            encode_fixed_echo(&request).unwrap(),
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x05, 0x0F, 0x01, 0x10, 0x00, 0x0A]
        );
        assert_eq!(
            encode_fixed_echo(&request[..8]).unwrap_err(),
            EncodeError::ValueOutOfRange
        );
    }
}
