use std::io::{Read, Write};

use kickpass_core::error::{Error, Result};

use crate::message::{Frame, MsgType};

/// Every frame on the wire is `type(1 byte) || len(4 bytes BE) || payload`.
/// A receiver that sees a length it does not expect for the given type
/// treats it as `Error::InvalidMsg` rather than attempting to resync.
pub fn write_frame(w: &mut impl Write, msg_type: MsgType, payload: &[u8]) -> Result<()> {
    let mut header = [0u8; 5];
    header[0] = msg_type as u8;
    header[1..5].copy_from_slice(&(payload.len() as u32).to_be_bytes());
    w.write_all(&header)?;
    w.write_all(payload)?;
    Ok(())
}

pub fn read_frame(r: &mut impl Read) -> Result<Frame> {
    let mut header = [0u8; 5];
    r.read_exact(&mut header).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::InvalidMsg
        } else {
            Error::from(e)
        }
    })?;
    let msg_type = MsgType::from_u8(header[0])?;
    let len = u32::from_be_bytes(header[1..5].try_into().unwrap()) as usize;

    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)?;
    Ok(Frame { msg_type, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DiscardRequest;

    #[test]
    fn round_trips_a_discard_request() {
        let req = DiscardRequest { name: "a/b".to_string() };
        let mut buf = Vec::new();
        write_frame(&mut buf, MsgType::Discard, &req.encode().unwrap()).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor).unwrap();
        assert_eq!(frame.msg_type, MsgType::Discard);
        let decoded = DiscardRequest::decode(&frame.payload).unwrap();
        assert_eq!(decoded, req);
    }
}
