use anyhow::{Context, Result};
use std::net::Ipv4Addr;
use std::time::Duration;

pub const USAGE: &str = "\
Envia pacotes ICMP ECHO_REQUEST para hosts da rede

Uso:
\tspping -h host [-c count][-i interval][-m ttl][-t timeout][-ov]

Opções:
\t[-c count]\tEnvia apenas count pacotes. Padrão: 0xffffff
\t[-i interval]\tIntervalo entre pedidos em segundos. Padrão: 1
\t[-m ttl]\tTTL dos pacotes enviados. Padrão: 64
\t[-t timeout]\tTimeout do socket em segundos. Padrão: 5
\t[-o]\t\tEnvia um único pacote (ping condicional): Host is up/down
\t[-v]\t\tModo verboso (mostra os campos crus dos pacotes)

Requer root (socket RAW).
";

pub const DEFAULT_COUNT: u64 = 0xff_ffff;

/// Configuração imutável de uma execução, montada uma vez a partir do argv.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub target: Ipv4Addr,
    pub count: u64,
    pub interval: Duration,
    pub ttl: u8,
    pub timeout: Duration,
    pub single_probe: bool,
    pub verbose: bool,
}

pub fn parse() -> Result<Config> {
    parse_from(std::env::args().skip(1))
}

pub fn parse_from<I, S>(argv: I) -> Result<Config>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = argv.into_iter().map(Into::into).collect();
    let mut dst_str = None;
    let mut count = DEFAULT_COUNT;
    let mut interval = Duration::from_secs(1);
    let mut ttl = 64u8;
    let mut timeout = Duration::from_secs(5);
    let mut single_probe = false;
    let mut verbose = false;

    // Estilo getopt("h:c:i:m:ot:v"): flags agrupadas (-ov, -vc 3) e valor
    // colado (-c3) ou no argumento seguinte (-c 3)
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let Some(flags) = arg.strip_prefix('-').filter(|f| !f.is_empty()) else {
            if dst_str.is_none() {
                dst_str = Some(arg);
            }
            i += 1;
            continue;
        };

        for (pos, flag) in flags.char_indices() {
            match flag {
                'o' => single_probe = true,
                'v' => verbose = true,
                'h' | 'c' | 'i' | 'm' | 't' => {
                    let attached = &flags[pos + flag.len_utf8()..];
                    let raw = if attached.is_empty() {
                        i += 1;
                        args.get(i)
                            .map(String::as_str)
                            .with_context(|| format!("Faltou o valor para -{}", flag))?
                    } else {
                        attached
                    };
                    match flag {
                        'h' => dst_str = Some(raw),
                        'c' => {
                            count = raw
                                .parse()
                                .with_context(|| format!("Valor inválido \"{}\" para -c", raw))?;
                        }
                        'i' => interval = seconds(raw, "-i")?,
                        'm' => {
                            ttl = raw
                                .parse()
                                .with_context(|| format!("Valor inválido \"{}\" para -m", raw))?;
                            if ttl == 0 {
                                anyhow::bail!("TTL deve estar entre 1 e 255");
                            }
                        }
                        _ => {
                            timeout = seconds(raw, "-t")?;
                            if timeout.is_zero() {
                                anyhow::bail!("Timeout deve ser maior que zero");
                            }
                        }
                    }
                    // O resto do argumento era o valor
                    break;
                }
                other => anyhow::bail!("Opção desconhecida: -{}", other),
            }
        }
        i += 1;
    }

    let dst_str = dst_str.context("Faltou o host de destino (-h host)")?;
    let target: Ipv4Addr = dst_str
        .parse()
        .with_context(|| format!("Endereço IPv4 inválido: {}", dst_str))?;

    if single_probe {
        count = 1;
    }

    Ok(Config {
        target,
        count,
        interval,
        ttl,
        timeout,
        single_probe,
        verbose,
    })
}

fn seconds(raw: &str, flag: &str) -> Result<Duration> {
    let secs: f64 = raw
        .parse()
        .with_context(|| format!("Valor inválido \"{}\" para {}", raw, flag))?;
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Valor inválido \"{}\" para {}", raw, flag))
}
