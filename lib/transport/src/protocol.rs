//! Plaintext wire payloads (spec §3 "Command tag", §6 "Request/response payloads").
//! These are encoded into a [`Buffer`] *before* [`crate::codec`] encrypts them, and
//! decoded from a [`Buffer`] *after* it decrypts them.

use crate::buffer::{Buffer, CursorError, CursorMode};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum Status {
    Ok = 6,
    Bad = 7,
    BadName = 8,
}

impl Status {
    fn from_tag(tag: u32) -> Option<Status> {
        match tag {
            6 => Some(Status::Ok),
            7 => Some(Status::Bad),
            8 => Some(Status::BadName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Request {
    Quit,
    Name { name: Vec<u8> },
    Send { name: Vec<u8>, content: Vec<u8> },
    List,
    Pull { name: Vec<u8> },
}

impl Request {
    const TAG_QUIT: u32 = 1;
    const TAG_SEND: u32 = 2;
    const TAG_LIST: u32 = 3;
    const TAG_PULL: u32 = 4;
    const TAG_NAME: u32 = 5;

    /// Encodes this request into a freshly-reset plaintext buffer.
    pub fn encode(&self, buf: &mut Buffer) -> Result<(), CursorError> {
        let mut cur = buf.cursor(CursorMode::Write);
        cur.reset();
        match self {
            Request::Quit => cur.write_u32(Self::TAG_QUIT)?,
            Request::Name { name } => {
                cur.write_u32(Self::TAG_NAME)?;
                cur.write_u32(name.len() as u32)?;
                cur.write_bytes(name)?;
            }
            Request::Send { name, content } => {
                cur.write_u32(Self::TAG_SEND)?;
                cur.write_u32(name.len() as u32)?;
                cur.write_u32(content.len() as u32)?;
                cur.write_bytes(name)?;
                cur.write_bytes(content)?;
            }
            Request::List => cur.write_u32(Self::TAG_LIST)?,
            Request::Pull { name } => {
                cur.write_u32(Self::TAG_PULL)?;
                cur.write_u32(name.len() as u32)?;
                cur.write_bytes(name)?;
            }
        }
        Ok(())
    }

    /// Decodes a request tag and body from a plaintext buffer.
    ///
    /// An unrecognized tag is an "unknown command" (§7): it is not an error, the
    /// caller should silently skip the message.
    pub fn decode(buf: &mut Buffer) -> Result<Option<Request>, CursorError> {
        let mut cur = buf.cursor(CursorMode::Read);
        let tag = cur.read_u32()?;
        let request = match tag {
            Self::TAG_QUIT => Request::Quit,
            Self::TAG_NAME => {
                let len = cur.read_u32()? as usize;
                let name = cur.read_bytes(len)?.to_vec();
                Request::Name { name }
            }
            Self::TAG_SEND => {
                let name_len = cur.read_u32()? as usize;
                let content_len = cur.read_u32()? as usize;
                let name = cur.read_bytes(name_len)?.to_vec();
                let content = cur.read_bytes(content_len)?.to_vec();
                Request::Send { name, content }
            }
            Self::TAG_LIST => Request::List,
            Self::TAG_PULL => {
                let len = cur.read_u32()? as usize;
                let name = cur.read_bytes(len)?.to_vec();
                Request::Pull { name }
            }
            _ => return Ok(None),
        };
        Ok(Some(request))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Response {
    Status(Status),
    List(Vec<Vec<u8>>),
    Pull(Vec<u8>),
}

impl Response {
    pub fn encode(&self, buf: &mut Buffer) -> Result<(), CursorError> {
        let mut cur = buf.cursor(CursorMode::Write);
        cur.reset();
        match self {
            Response::Status(status) => cur.write_u32(*status as u32)?,
            Response::List(names) => {
                cur.write_u32(Status::Ok as u32)?;
                cur.write_u32(names.len() as u32)?;
                for name in names {
                    cur.write_u32(name.len() as u32)?;
                    cur.write_bytes(name)?;
                }
            }
            Response::Pull(content) => {
                cur.write_u32(Status::Ok as u32)?;
                cur.write_u32(content.len() as u32)?;
                cur.write_bytes(content)?;
            }
        }
        Ok(())
    }

    /// Decodes a response whose shape is known ahead of time by the caller (the
    /// client always knows which request it just sent).
    pub fn decode(buf: &mut Buffer, expect_payload: ExpectPayload) -> Result<Response, CursorError> {
        let mut cur = buf.cursor(CursorMode::Read);
        let tag = cur.read_u32()?;

        if expect_payload == ExpectPayload::None {
            let status = Status::from_tag(tag).unwrap_or(Status::Bad);
            return Ok(Response::Status(status));
        }

        if Status::from_tag(tag) != Some(Status::Ok) {
            let status = Status::from_tag(tag).unwrap_or(Status::Bad);
            return Ok(Response::Status(status));
        }

        match expect_payload {
            ExpectPayload::List => {
                let count = cur.read_u32()? as usize;
                let mut names = Vec::with_capacity(count);
                for _ in 0..count {
                    let len = cur.read_u32()? as usize;
                    names.push(cur.read_bytes(len)?.to_vec());
                }
                Ok(Response::List(names))
            }
            ExpectPayload::Pull => {
                let len = cur.read_u32()? as usize;
                let content = cur.read_bytes(len)?.to_vec();
                Ok(Response::Pull(content))
            }
            ExpectPayload::None => unreachable!(),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExpectPayload {
    None,
    List,
    Pull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_roundtrip() {
        let mut buf = Buffer::new(4096);
        let request = Request::Send {
            name: b"hello.txt".to_vec(),
            content: b"Hi!".to_vec(),
        };
        request.encode(&mut buf).unwrap();

        let decoded = Request::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn list_response_roundtrip() {
        let mut buf = Buffer::new(4096);
        let response = Response::List(vec![b"a".to_vec(), b"b".to_vec()]);
        response.encode(&mut buf).unwrap();

        let decoded = Response::decode(&mut buf, ExpectPayload::List).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn unknown_tag_decodes_to_none() {
        let mut buf = Buffer::new(16);
        {
            let mut cur = buf.cursor(CursorMode::Write);
            cur.write_u32(99).unwrap();
        }
        assert_eq!(Request::decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn bad_name_status_roundtrip() {
        let mut buf = Buffer::new(16);
        Response::Status(Status::BadName).encode(&mut buf).unwrap();
        let decoded = Response::decode(&mut buf, ExpectPayload::None).unwrap();
        assert_eq!(decoded, Response::Status(Status::BadName));
    }
}
