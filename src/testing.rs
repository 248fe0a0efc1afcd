//! Sockets em memória para os testes: devolvem cada Echo Request como Echo
//! Reply, injetam tráfego alheio, nunca respondem ou falham.

use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::echo::EchoSocket;
use crate::icmp::{ECHO_REPLY, checksum};

/// Monta um datagrama IPv4 (protocolo 1) com `ihl` palavras de cabeçalho.
pub fn ipv4_datagram(source: Ipv4Addr, ihl: u8, icmp: &[u8]) -> Vec<u8> {
    let header_len = ihl as usize * 4;
    let total = header_len + icmp.len();
    let mut d = vec![0u8; header_len];
    d[0] = 0x40 | ihl;
    d[2..4].copy_from_slice(&(total as u16).to_be_bytes());
    d[8] = 64;
    d[9] = 1;
    d[12..16].copy_from_slice(&source.octets());
    d[16..20].copy_from_slice(&Ipv4Addr::LOCALHOST.octets());
    d.extend_from_slice(icmp);
    d
}

/// Transforma um Echo Request serializado na resposta que o alvo enviaria.
pub fn echo_reply_for(request: &[u8]) -> Vec<u8> {
    let mut reply = request.to_vec();
    reply[0] = ECHO_REPLY;
    reply[2] = 0;
    reply[3] = 0;
    let csum = checksum(&reply);
    reply[2..4].copy_from_slice(&csum.to_le_bytes());
    reply
}

fn copy_into(buf: &mut [u8], datagram: &[u8]) -> usize {
    let n = datagram.len().min(buf.len());
    buf[..n].copy_from_slice(&datagram[..n]);
    n
}

pub struct FakeSocket {
    pub sent: Vec<Vec<u8>>,
    inbox: VecDeque<Vec<u8>>,
    respond: bool,
    ihl: u8,
    // Quanto um recv vazio demora antes de sinalizar timeout
    idle: Duration,
    recv_timeout: Option<Duration>,
    interrupt: bool,
}

impl FakeSocket {
    /// Alvo que responde a tudo com cabeçalho IP de 20 bytes.
    pub fn loopback() -> Self {
        FakeSocket {
            sent: Vec::new(),
            inbox: VecDeque::new(),
            respond: true,
            ihl: 5,
            idle: Duration::ZERO,
            recv_timeout: None,
            interrupt: false,
        }
    }

    /// Alvo que nunca responde; cada recv bloqueia até `idle` e dá timeout.
    pub fn silent(idle: Duration) -> Self {
        FakeSocket {
            respond: false,
            idle,
            ..Self::loopback()
        }
    }

    pub fn with_ihl(mut self, ihl: u8) -> Self {
        self.ihl = ihl;
        self
    }

    pub fn inject(&mut self, datagram: Vec<u8>) {
        self.inbox.push_back(datagram);
    }

    /// O próximo recv falha com EINTR.
    pub fn interrupt_next(&mut self) {
        self.interrupt = true;
    }

    /// Números de sequência observados nos pacotes enviados.
    pub fn sent_sequences(&self) -> Vec<u16> {
        self.sent
            .iter()
            .map(|p| u16::from_be_bytes([p[6], p[7]]))
            .collect()
    }
}

impl EchoSocket for FakeSocket {
    fn send_packet(&mut self, packet: &[u8], target: Ipv4Addr) -> io::Result<usize> {
        self.sent.push(packet.to_vec());
        if self.respond {
            let reply = echo_reply_for(packet);
            self.inbox.push_back(ipv4_datagram(target, self.ihl, &reply));
        }
        Ok(packet.len())
    }

    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if std::mem::take(&mut self.interrupt) {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        match self.inbox.pop_front() {
            Some(d) => Ok(copy_into(buf, &d)),
            None => {
                let wait = self.recv_timeout.map_or(self.idle, |t| t.min(self.idle));
                thread::sleep(wait);
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
        }
    }

    fn set_recv_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.recv_timeout = Some(timeout);
        Ok(())
    }
}

/// Socket que recebe tráfego alheio sem parar, um datagrama a cada `gap`.
pub struct NoisySocket {
    pub datagram: Vec<u8>,
    pub gap: Duration,
}

impl EchoSocket for NoisySocket {
    fn send_packet(&mut self, packet: &[u8], _target: Ipv4Addr) -> io::Result<usize> {
        Ok(packet.len())
    }

    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(self.gap);
        Ok(copy_into(buf, &self.datagram))
    }

    fn set_recv_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

/// Um único datagrama alheio chega após `delay`; depois só timeout, cada
/// recv bloqueando pelo timeout configurado como um socket real.
pub struct LateNoiseSocket {
    pub timeouts: Vec<Duration>,
    delay: Duration,
    noise: Option<Vec<u8>>,
}

impl LateNoiseSocket {
    pub fn new(delay: Duration, noise: Vec<u8>) -> Self {
        LateNoiseSocket {
            timeouts: Vec::new(),
            delay,
            noise: Some(noise),
        }
    }
}

impl EchoSocket for LateNoiseSocket {
    fn send_packet(&mut self, packet: &[u8], _target: Ipv4Addr) -> io::Result<usize> {
        Ok(packet.len())
    }

    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeouts.last().copied().unwrap_or(Duration::MAX);
        match self.noise.take() {
            Some(d) if self.delay < timeout => {
                thread::sleep(self.delay);
                Ok(copy_into(buf, &d))
            }
            _ => {
                thread::sleep(timeout);
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
        }
    }

    fn set_recv_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeouts.push(timeout);
        Ok(())
    }
}

/// Simula Ctrl+C: o handler limpa `running` e o recv volta com EINTR.
pub struct InterruptedSocket {
    pub running: Arc<AtomicBool>,
}

impl EchoSocket for InterruptedSocket {
    fn send_packet(&mut self, packet: &[u8], _target: Ipv4Addr) -> io::Result<usize> {
        Ok(packet.len())
    }

    fn recv_datagram(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        self.running.store(false, Ordering::SeqCst);
        Err(io::Error::from(io::ErrorKind::Interrupted))
    }

    fn set_recv_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

/// Socket que falha no envio ou no recebimento com erro que não é timeout.
pub enum BrokenSocket {
    Send,
    Recv,
}

impl EchoSocket for BrokenSocket {
    fn send_packet(&mut self, packet: &[u8], _target: Ipv4Addr) -> io::Result<usize> {
        match self {
            BrokenSocket::Send => Err(io::Error::from(io::ErrorKind::HostUnreachable)),
            BrokenSocket::Recv => Ok(packet.len()),
        }
    }

    fn recv_datagram(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::ConnectionReset))
    }

    fn set_recv_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}
