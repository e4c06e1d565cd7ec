#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use skv_client::{ClientConfig, StoreClient};

/// Spawns a scripted RESP server.
///
/// `handler` sees every command (numbered across connections) and returns the
/// raw reply bytes to send back. Connections are served one after another.
pub fn spawn_server<F>(mut handler: F) -> String
where
    F: FnMut(usize, Vec<Vec<u8>>) -> Vec<u8> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    thread::spawn(move || {
        let mut idx = 0;
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => return,
            };
            let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            while let Ok(Some(args)) = read_command(&mut reader) {
                let reply = handler(idx, args);
                idx += 1;
                if stream.write_all(&reply).and_then(|_| stream.flush()).is_err() {
                    break;
                }
            }
        }
    });

    addr
}

/// Spawns a server that expects exactly `script.len()` commands, asserting
/// each command's arguments before sending the paired reply.
pub fn spawn_script(script: Vec<(Vec<&'static str>, Vec<u8>)>) -> String {
    spawn_server(move |idx, args| {
        let (expected, reply) = script
            .get(idx)
            .unwrap_or_else(|| panic!("unexpected command #{idx}: {}", render(&args)));
        assert_eq!(render(&args), expected.join(" "), "command #{idx}");
        reply.clone()
    })
}

/// Spawns a tiny in-memory string store understanding `SET` (with `NX`, `EX`,
/// `PX`), `GET` and `DEL`, honouring expiry.
pub fn spawn_string_store() -> String {
    let mut data: HashMap<Vec<u8>, (Vec<u8>, Option<Instant>)> = HashMap::new();
    spawn_server(move |_, args| {
        let now = Instant::now();
        data.retain(|_, (_, expires_at)| expires_at.map_or(true, |at| at > now));

        match args[0].to_ascii_uppercase().as_slice() {
            b"SET" => {
                let mut nx = false;
                let mut expires_at = None;
                let mut options = args[3..].iter();
                while let Some(option) = options.next() {
                    match option.to_ascii_uppercase().as_slice() {
                        b"NX" => nx = true,
                        b"EX" | b"PX" => {
                            let amount: u64 = String::from_utf8_lossy(options.next().expect("ttl"))
                                .parse()
                                .expect("numeric ttl");
                            let ttl = if option.eq_ignore_ascii_case(b"EX") {
                                Duration::from_secs(amount)
                            } else {
                                Duration::from_millis(amount)
                            };
                            expires_at = Some(now + ttl);
                        }
                        _ => return error("ERR syntax error"),
                    }
                }
                if nx && data.contains_key(&args[1]) {
                    return null_bulk();
                }
                data.insert(args[1].clone(), (args[2].clone(), expires_at));
                simple("OK")
            }
            b"GET" => match data.get(&args[1]) {
                Some((value, _)) => bulk(&String::from_utf8_lossy(value)),
                None => null_bulk(),
            },
            b"DEL" => integer(data.remove(&args[1]).is_some() as i64),
            _ => error("ERR unknown command"),
        }
    })
}

pub fn client_with_addr(addr: String) -> StoreClient {
    StoreClient::with_config(test_config(addr))
}

pub fn test_config(addr: String) -> ClientConfig {
    ClientConfig {
        pool_size: 1,
        pool_timeout: Duration::from_secs(1),
        idle_timeout: Duration::from_secs(60),
        read_timeout: Some(Duration::from_secs(1)),
        write_timeout: Some(Duration::from_secs(1)),
        connect_timeout: Some(Duration::from_secs(1)),
        ..ClientConfig::with_addr(addr)
    }
}

pub fn render(args: &[Vec<u8>]) -> String {
    args.iter()
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn simple(msg: &str) -> Vec<u8> {
    format!("+{msg}\r\n").into_bytes()
}

pub fn error(msg: &str) -> Vec<u8> {
    format!("-{msg}\r\n").into_bytes()
}

pub fn integer(value: i64) -> Vec<u8> {
    format!(":{value}\r\n").into_bytes()
}

pub fn bulk(data: &str) -> Vec<u8> {
    format!("${}\r\n{data}\r\n", data.len()).into_bytes()
}

pub fn null_bulk() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn null_array() -> Vec<u8> {
    b"*-1\r\n".to_vec()
}

pub fn array(items: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        out.extend_from_slice(&item);
    }
    out
}

/// `[id, [field, value, ...]]` as returned inside stream replies.
pub fn entry(id: &str, fields: &[(&str, &str)]) -> Vec<u8> {
    let body = fields
        .iter()
        .flat_map(|(field, value)| [bulk(field), bulk(value)])
        .collect();
    array(vec![bulk(id), array(body)])
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Option<Vec<Vec<u8>>>> {
    let mut line = Vec::new();
    if read_line(reader, &mut line)?.is_none() {
        return Ok(None);
    }
    if line.first() != Some(&b'*') {
        return Err(invalid("expected array"));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line)?.ok_or_else(|| invalid("eof"))?;
        if line.first() != Some(&b'$') {
            return Err(invalid("expected bulk"));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(invalid("missing crlf"));
        }
        args.push(data);
    }
    Ok(Some(args))
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<Option<()>> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(invalid("invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| invalid("digit"))
}

fn invalid(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}
