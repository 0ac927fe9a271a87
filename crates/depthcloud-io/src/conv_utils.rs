/// Reassemble big-endian byte pairs, as stored by 16-bit PNG files, into samples.
pub fn convert_buf_u8_u16(buf: Vec<u8>) -> Vec<u16> {
    buf.chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Split samples into big-endian byte pairs.
pub fn convert_buf_u16_u8(buf: &[u16]) -> Vec<u8> {
    buf.iter().flat_map(|sample| sample.to_be_bytes()).collect()
}
