//! Length-prefixed fields of the wire format
//!
//! Strings and byte payloads are written as a 4-byte big-endian length
//! followed by that many bytes. Strings are UTF-8.
//!
//! Reads complete only once the exact byte count has arrived; a connection
//! closed half way through is an error, never a short result.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::constants::MAX_MESSAGE_SIZE;
use crate::{Error, Result};

/// Size of a length prefix on the wire
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Append a length prefix for a payload of `len` bytes.
///
/// Returns an error if the payload exceeds MAX_MESSAGE_SIZE.
pub fn put_length(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::InvalidMessage(format!(
            "payload too large: {} bytes (max {})",
            len, MAX_MESSAGE_SIZE
        )));
    }

    buf.extend_from_slice(&(len as u32).to_be_bytes());
    Ok(())
}

/// Append a length-prefixed UTF-8 string
pub fn put_string(buf: &mut Vec<u8>, value: &str) -> Result<()> {
    put_bytes(buf, value.as_bytes())
}

/// Append a length-prefixed byte payload
pub fn put_bytes(buf: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    put_length(buf, data.len())?;
    buf.extend_from_slice(data);
    Ok(())
}

/// Read a length prefix from an async reader.
///
/// Returns an error if the announced length exceeds MAX_MESSAGE_SIZE.
pub async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<usize> {
    let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::InvalidMessage(format!(
            "payload too large: {} bytes (max {})",
            len, MAX_MESSAGE_SIZE
        )));
    }

    Ok(len)
}

/// Read a length-prefixed byte payload
pub async fn read_bytes<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_length(reader).await?;

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    Ok(payload)
}

/// Read a length-prefixed UTF-8 string
pub async fn read_string<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String> {
    let bytes = read_bytes(reader).await?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidMessage(format!("invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_string_layout() {
        let mut buf = Vec::new();
        put_string(&mut buf, "XYZ789").unwrap();

        assert_eq!(&buf[..4], &[0, 0, 0, 6]);
        assert_eq!(&buf[4..], b"XYZ789");
    }

    #[test]
    fn test_length_is_big_endian() {
        let mut buf = Vec::new();
        put_length(&mut buf, 0x0001_0203).unwrap();
        assert_eq!(buf, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_put_rejects_oversized_payload() {
        let mut buf = Vec::new();
        assert!(matches!(
            put_length(&mut buf, MAX_MESSAGE_SIZE + 1),
            Err(Error::InvalidMessage(_))
        ));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_string_roundtrip_with_multibyte_text() {
        let original = "Grüße\nWorld ✓";

        let mut buf = Vec::new();
        put_string(&mut buf, original).unwrap();
        assert_eq!(buf.len(), LENGTH_PREFIX_SIZE + original.len());

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_string(&mut cursor).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_bytes_roundtrip_empty_and_binary() {
        for original in [Vec::new(), vec![0u8, 255, 10, 13, 0]] {
            let mut buf = Vec::new();
            put_bytes(&mut buf, &original).unwrap();

            let mut cursor = Cursor::new(buf);
            assert_eq!(read_bytes(&mut cursor).await.unwrap(), original);
        }
    }

    #[tokio::test]
    async fn test_read_waits_for_split_delivery() {
        // Length and body arrive in separate chunks
        let mut reader = tokio_test::io::Builder::new()
            .read(&[0, 0])
            .read(&[0, 5, b'h'])
            .read(b"ello")
            .build();

        assert_eq!(read_string(&mut reader).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_read_fails_on_truncated_body() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 10, b'a', b'b']);
        assert!(matches!(read_bytes(&mut cursor).await, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_length() {
        let mut cursor = Cursor::new(u32::MAX.to_be_bytes().to_vec());
        assert!(matches!(
            read_length(&mut cursor).await,
            Err(Error::InvalidMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_read_rejects_invalid_utf8() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 2, 0xC3, 0x28]);
        assert!(matches!(
            read_string(&mut cursor).await,
            Err(Error::InvalidMessage(_))
        ));
    }
}
