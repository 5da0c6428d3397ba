//! Command handlers driving one [`MessageChannel`] (spec §6 "CLI - client").

use std::fs;
use std::io;
use transport::buffer::Buffer;
use transport::codec::MessageChannel;
use transport::protocol::{ExpectPayload, Request, Response, Status};

fn request_len(request: &Request) -> usize {
    match request {
        Request::Quit | Request::List => 4,
        Request::Name { name } => 8 + name.len(),
        Request::Pull { name } => 8 + name.len(),
        Request::Send { name, content } => 12 + name.len() + content.len(),
    }
}

fn cursor_err(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

fn roundtrip(channel: &mut MessageChannel, request: Request, expect: ExpectPayload) -> io::Result<Response> {
    let mut outgoing = Buffer::new(request_len(&request));
    request.encode(&mut outgoing).map_err(cursor_err)?;
    channel.send(&outgoing).map_err(io::Error::from)?;

    let mut incoming = channel.recv().map_err(io::Error::from)?;
    Response::decode(&mut incoming, expect).map_err(cursor_err)
}

pub fn cmd_quit(channel: &mut MessageChannel) {
    let mut outgoing = Buffer::new(4);
    let _ = Request::Quit.encode(&mut outgoing);
    let _ = channel.send(&outgoing);
}

pub fn cmd_name(channel: &mut MessageChannel, name: &str) -> io::Result<()> {
    let response = roundtrip(channel, Request::Name { name: name.as_bytes().to_vec() }, ExpectPayload::None)?;
    print_status(&response);
    Ok(())
}

pub fn cmd_send(channel: &mut MessageChannel, path: &str) -> io::Result<()> {
    let content = fs::read(path)?;
    let name = path.as_bytes().to_vec();
    let response = roundtrip(channel, Request::Send { name, content }, ExpectPayload::None)?;
    print_status(&response);
    Ok(())
}

pub fn cmd_list(channel: &mut MessageChannel) -> io::Result<()> {
    let response = roundtrip(channel, Request::List, ExpectPayload::List)?;
    match response {
        Response::List(names) => {
            for name in names {
                println!("{}", String::from_utf8_lossy(&name));
            }
        }
        other => print_status(&other),
    }
    Ok(())
}

/// Writes the pulled content to `./<query>` - the query the user typed, not
/// necessarily the stored entry's own name, since `pull` matches by substring.
pub fn cmd_pull(channel: &mut MessageChannel, query: &str) -> io::Result<()> {
    let response = roundtrip(channel, Request::Pull { name: query.as_bytes().to_vec() }, ExpectPayload::Pull)?;
    match response {
        Response::Pull(content) => {
            fs::write(format!("./{query}"), content)?;
            println!("wrote ./{query}");
        }
        other => print_status(&other),
    }
    Ok(())
}

fn print_status(response: &Response) {
    match response {
        Response::Status(Status::Ok) => println!("OK"),
        Response::Status(Status::Bad) => println!("BAD"),
        Response::Status(Status::BadName) => println!("BAD_NAME (send `name` first)"),
        Response::List(_) | Response::Pull(_) => println!("OK"),
    }
}
