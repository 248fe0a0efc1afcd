use anyhow::{Context, Result};
use log::{debug, trace};
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::icmp::{self, ECHO_HEADER_LEN, ECHO_REPLY, EchoHeader, EchoReply, EchoRequest};

// Maior datagrama IPv4 que esperamos (MTU típica)
const RECV_BUF_LEN: usize = 1500;

/// O que a transação precisa do socket RAW.
///
/// `recv_datagram` devolve o datagrama IP completo e deve falhar com
/// `WouldBlock` ou `TimedOut` quando o timeout de leitura expira.
/// `set_recv_timeout` recebe sempre uma duração maior que zero.
pub trait EchoSocket {
    fn send_packet(&mut self, packet: &[u8], target: Ipv4Addr) -> io::Result<usize>;
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn set_recv_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

/// Resposta aceita para um Echo Request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pong {
    pub peer: Ipv4Addr,
    pub size: usize,
    pub elapsed: Duration,
    pub header: EchoHeader,
}

impl Pong {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Up(Pong),
    Down,
    /// Ctrl+C durante a espera.
    Interrupted,
}

enum State {
    Waiting,
    Resolved(Outcome),
}

enum Event<'a> {
    Datagram { bytes: &'a [u8], at: Instant },
    TimedOut,
    Stopped,
}

/// Uma ida e volta Echo Request / Echo Reply por chamada.
pub struct Pinger {
    ident: u16,
    payload: &'static [u8],
    timeout: Duration,
    running: Option<Arc<AtomicBool>>,
}

impl Pinger {
    pub fn new(ident: u16, timeout: Duration) -> Self {
        Pinger {
            ident,
            payload: icmp::PAYLOAD,
            timeout,
            running: None,
        }
    }

    /// Abandona a espera quando `running` vira `false` (handler de Ctrl+C).
    pub fn with_stop_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn ident(&self) -> u16 {
        self.ident
    }

    /// Constrói o Echo Request da sequência `seq`, com o timestamp atual.
    pub fn request(&self, seq: u16) -> EchoRequest {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        EchoRequest::new(self.ident, seq, now, self.payload)
    }

    /// Envia `seq` e espera pela resposta.
    pub fn send_echo<S: EchoSocket>(&self, sock: &mut S, target: Ipv4Addr, seq: u16) -> Result<Outcome> {
        let request = self.request(seq);
        self.transact(sock, target, &request)
    }

    /// Envia um request já montado e bloqueia até a resposta ou o timeout.
    ///
    /// Datagramas que não são o nosso Echo Reply são descartados sem contar
    /// como resposta; a espera termina quando `timeout` passa desde o envio,
    /// pois cada leitura é limitada ao tempo que resta até o prazo.
    /// Erros de socket que não sejam timeout são fatais.
    pub fn transact<S: EchoSocket>(
        &self,
        sock: &mut S,
        target: Ipv4Addr,
        request: &EchoRequest,
    ) -> Result<Outcome> {
        let sent = Instant::now();
        sock.send_packet(&request.packet, target)
            .with_context(|| format!("Falha ao enviar Echo Request para {}", target))?;
        debug!("echo seq={} id={} enviado para {}", request.header.seq, self.ident, target);

        let deadline = sent + self.timeout;
        let mut buf = [0u8; RECV_BUF_LEN];

        loop {
            if self.stopped() {
                return Ok(Outcome::Interrupted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Outcome::Down);
            }
            sock.set_recv_timeout(remaining)
                .context("Falha ao ajustar timeout do socket")?;

            let event = match sock.recv_datagram(&mut buf) {
                Ok(n) => Event::Datagram {
                    bytes: &buf[..n],
                    at: Instant::now(),
                },
                Err(e) if is_timeout(&e) => Event::TimedOut,
                // SIGINT interrompe o recv (socket com timeout não é reiniciado)
                Err(e) if e.kind() == io::ErrorKind::Interrupted && self.stopped() => Event::Stopped,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Fatal: erro geral em recvfrom()"),
            };

            if let State::Resolved(outcome) = self.advance(&request.header, sent, deadline, event) {
                return Ok(outcome);
            }
        }
    }

    /// Transição de estado a partir de `Waiting`.
    fn advance(&self, expected: &EchoHeader, sent: Instant, deadline: Instant, event: Event<'_>) -> State {
        match event {
            Event::TimedOut => State::Resolved(Outcome::Down),
            Event::Stopped => State::Resolved(Outcome::Interrupted),
            Event::Datagram { bytes, at } => match icmp::parse_reply(bytes) {
                Some(reply) if self.matches(expected, &reply) => {
                    debug!("echo seq={} respondido por {} (ttl {})", reply.header.seq, reply.source, reply.ttl);
                    State::Resolved(Outcome::Up(Pong {
                        peer: reply.source,
                        size: reply.ip_header_len + ECHO_HEADER_LEN + self.payload.len(),
                        elapsed: at.saturating_duration_since(sent),
                        header: reply.header,
                    }))
                }
                other => {
                    match other {
                        Some(r) => trace!(
                            "descartado: type={} id={} seq={} de {}",
                            r.header.icmp_type, r.header.ident, r.header.seq, r.source
                        ),
                        None => trace!("descartado: datagrama de {} bytes ilegível", bytes.len()),
                    }
                    if at >= deadline {
                        State::Resolved(Outcome::Down)
                    } else {
                        State::Waiting
                    }
                }
            },
        }
    }

    fn stopped(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.load(Ordering::SeqCst))
    }

    fn matches(&self, expected: &EchoHeader, reply: &EchoReply) -> bool {
        reply.header.icmp_type == ECHO_REPLY
            && reply.header.ident == self.ident
            && reply.header.seq == expected.seq
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
