// Criação e configuração do socket RAW ICMPv4
use anyhow::{Context, Result};
use log::debug;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::args::Config;
use crate::echo::EchoSocket;

/// Abre o socket RAW com o timeout de leitura e o TTL de saída configurados.
pub fn open(config: &Config) -> Result<Socket> {
    // Type::RAW exige a feature "all" do socket2; usamos SOCK_RAW direto
    let sock = match Socket::new(Domain::IPV4, Type::from(libc::SOCK_RAW), Some(Protocol::ICMPV4)) {
        Ok(sock) => sock,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(e).context("Fatal: é preciso ser root para enviar pacotes ICMP");
        }
        Err(e) => return Err(e).context("Fatal: erro geral em socket()"),
    };

    configure(&sock, config)?;
    debug!("socket RAW aberto: timeout={:?} ttl={}", config.timeout, config.ttl);

    Ok(sock)
}

fn configure(sock: &Socket, config: &Config) -> Result<()> {
    sock.set_read_timeout(Some(config.timeout))
        .context("Falha ao configurar timeout do socket")?;
    sock.set_ttl_v4(u32::from(config.ttl))
        .context("Falha ao configurar TTL")?;
    Ok(())
}

impl EchoSocket for Socket {
    fn send_packet(&mut self, packet: &[u8], target: Ipv4Addr) -> io::Result<usize> {
        // Porta é ignorada para ICMP
        let dst = SocketAddr::new(IpAddr::V4(target), 0);
        self.send_to(packet, &dst.into())
    }

    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Em socket RAW IPv4 o datagrama chega com o cabeçalho IP
        self.read(buf)
    }

    fn set_recv_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }
}
