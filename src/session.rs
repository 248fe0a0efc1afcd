use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::args::Config;
use crate::echo::{EchoSocket, Outcome, Pinger};
use crate::report;

/// Como a execução terminou.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Todos os pacotes enviados (ou Ctrl+C) em modo contínuo.
    Completed,
    HostUp,
    HostDown,
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Completed | RunStatus::HostUp => ExitCode::SUCCESS,
            RunStatus::HostDown => ExitCode::FAILURE,
        }
    }
}

/// Loop principal ping-pong: uma transação por sequência, estritamente em
/// ordem, com `config.interval` entre elas.
pub fn run<S, W>(
    config: &Config,
    pinger: &Pinger,
    sock: &mut S,
    out: &mut W,
    running: &AtomicBool,
) -> Result<RunStatus>
where
    S: EchoSocket,
    W: Write,
{
    debug!(
        "pingando {} id={} count={} interval={:?} ttl={} timeout={:?}",
        config.target,
        pinger.ident(),
        config.count,
        config.interval,
        config.ttl,
        config.timeout
    );

    for n in 0..config.count {
        if !running.load(Ordering::SeqCst) {
            info!("interrompido após {} pacotes", n);
            break;
        }

        // Sequência no fio é de 16 bits (wrap around)
        let seq = n as u16;
        let outcome = if config.verbose {
            let request = pinger.request(seq);
            report::ping(out, &request.header, config.target).context("Erro ao escrever saída")?;
            pinger.transact(sock, config.target, &request)?
        } else {
            pinger.send_echo(sock, config.target, seq)?
        };
        if outcome == Outcome::Interrupted {
            info!("interrompido aguardando seq={}", seq);
            // Sem resposta confirmada: o ping condicional falha
            return Ok(if config.single_probe {
                RunStatus::HostDown
            } else {
                RunStatus::Completed
            });
        }
        if config.single_probe {
            return probe_result(config, out, outcome);
        }

        let written = match outcome {
            Outcome::Up(pong) if config.verbose => report::pong(out, &pong),
            Outcome::Up(pong) => report::reply(out, &pong, config.ttl),
            Outcome::Down | Outcome::Interrupted => report::host_down(out),
        };
        written.context("Erro ao escrever saída")?;

        // Não dorme depois do último
        if n + 1 < config.count && !config.interval.is_zero() {
            thread::sleep(config.interval);
        }
    }

    Ok(RunStatus::Completed)
}

fn probe_result<W: Write>(config: &Config, out: &mut W, outcome: Outcome) -> Result<RunStatus> {
    let status = match outcome {
        Outcome::Up(pong) => {
            let written = if config.verbose {
                report::pong(out, &pong)
            } else {
                report::host_up(out)
            };
            written.context("Erro ao escrever saída")?;
            RunStatus::HostUp
        }
        Outcome::Down | Outcome::Interrupted => {
            report::host_down(out).context("Erro ao escrever saída")?;
            RunStatus::HostDown
        }
    };
    Ok(status)
}
