use std::io::{self, Write};
use std::net::Ipv4Addr;

use crate::echo::Pong;
use crate::icmp::EchoHeader;

pub const HOST_UP: &str = "Host is up";
pub const HOST_DOWN: &str = "Host is down";

/// Linha normal de resposta.
pub fn reply<W: Write>(out: &mut W, pong: &Pong, ttl: u8) -> io::Result<()> {
    writeln!(
        out,
        "{} bytes from {}: seq={} ttl={} time={:.4} ms",
        pong.size,
        pong.peer,
        pong.header.seq,
        ttl,
        pong.elapsed_ms()
    )
}

/// Verboso: cabeçalho cru antes do envio.
pub fn ping<W: Write>(out: &mut W, header: &EchoHeader, target: Ipv4Addr) -> io::Result<()> {
    writeln!(out, "Ping: {}, {}", header, target)
}

/// Verboso: cabeçalho cru da resposta, origem, tamanho e tempo.
pub fn pong<W: Write>(out: &mut W, pong: &Pong) -> io::Result<()> {
    writeln!(
        out,
        "Pong: {}, {}, {}, {:.4}",
        pong.header,
        pong.peer,
        pong.size,
        pong.elapsed_ms()
    )
}

pub fn host_up<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", HOST_UP)
}

pub fn host_down<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", HOST_DOWN)
}
