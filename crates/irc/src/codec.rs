use {
    bytes::{BufMut, BytesMut},
    fez_channels::Error,
    tokio_util::codec::{Decoder, Encoder},
};

use crate::Message;

/// Longest inbound line accepted; tags may push servers past 512 bytes.
const MAX_INBOUND_BYTES: usize = 8191 + 512;

/// CRLF line framing. Inbound bytes are decoded lossily and blank lines are
/// skipped. Outbound lines must not contain CR, LF or NUL; length limits are
/// the caller's business.
#[derive(Debug, Default, Clone, Copy)]
pub struct IrcCodec;

impl Decoder for IrcCodec {
    type Error = Error;
    type Item = String;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        loop {
            let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                if src.len() > MAX_INBOUND_BYTES {
                    return Err(Error::protocol(format!(
                        "inbound line exceeds {MAX_INBOUND_BYTES} bytes"
                    )));
                }
                return Ok(None);
            };
            let line = src.split_to(newline + 1);
            let text = String::from_utf8_lossy(&line)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&src[..])
            .trim_end_matches('\r')
            .to_string();
        src.clear();
        Ok((!text.is_empty()).then_some(text))
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = Error;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), Error> {
        let line = msg.to_string();
        if line.contains(['\r', '\n', '\0']) {
            return Err(Error::invalid_input(format!(
                "{} line contains a line break or NUL",
                msg.command
            )));
        }
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_split_lines() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::from(&b"PING :a\r\nPRIV"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :a"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"MSG #c :hi\n\r\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("PRIVMSG #c :hi")
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::from(&b"PRIVMSG #c :caf\xe9\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.starts_with("PRIVMSG #c :caf"));
        assert!(line.ends_with('\u{FFFD}'));
    }

    #[test]
    fn eof_flushes_unterminated_line() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::from(&b"ERROR :Closing link"[..]);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap().as_deref(),
            Some("ERROR :Closing link")
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn encodes_with_crlf() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::new();
        codec
            .encode(Message::privmsg("#c", "hello there"), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #c :hello there\r\n");
    }

    #[test]
    fn refuses_line_breaks() {
        let mut codec = IrcCodec;
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(Message::privmsg("#c", "a\r\nQUIT"), &mut buf),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            codec.encode(Message::privmsg("#c", "nul\0"), &mut buf),
            Err(Error::InvalidInput { .. })
        ));
        assert!(buf.is_empty());
    }
}
