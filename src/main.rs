// Tratamento de erros ergonômico
use anyhow::{Context, Result};

// Logs em stderr, controlados por RUST_LOG
use env_logger::Env;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// Módulos locais
mod args;
mod echo;
mod icmp;
mod report;
mod session;
mod socket;

#[cfg(test)]
mod testing;

/// Envia Echo Requests ao alvo e reporta alcance e latência.
/// Requer root (socket RAW).
fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    // Erros de argumento encerram antes de abrir qualquer socket
    let config = match args::parse() {
        Ok(config) => config,
        Err(e) => {
            // Erro em stderr, uso em stdout
            eprintln!("Fatal: {:#}", e);
            print!("{}", args::USAGE);
            return Ok(ExitCode::FAILURE);
        }
    };

    // Ctrl+C interrompe a espera pela resposta (recv volta com EINTR) e o
    // loop principal não inicia nova transação; o sleep do intervalo não é
    // interrompido
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Erro ao configurar handler de Ctrl+C")?;

    let mut sock = socket::open(&config)?;

    // Identificador: usa o PID do processo (comum em pings)
    let pinger = echo::Pinger::new(std::process::id() as u16, config.timeout).with_stop_flag(running.clone());

    let stdout = io::stdout();
    let status = session::run(&config, &pinger, &mut sock, &mut stdout.lock(), &running)?;
    Ok(status.exit_code())
}
