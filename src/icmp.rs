use std::fmt;
use std::net::Ipv4Addr;

/// Echo Request (RFC 792).
pub const ECHO_REQUEST: u8 = 8;
/// Echo Reply (RFC 792).
pub const ECHO_REPLY: u8 = 0;

/// type + code + checksum + identifier + sequence + timestamp de envio (8 bytes).
pub const ECHO_HEADER_LEN: usize = 16;

const MIN_IPV4_HEADER_LEN: usize = 20;

/// Payload fixo enviado em todo Echo Request.
pub const PAYLOAD: &[u8] = b"PING-PONG FROM SPPING";

/// Calcula o checksum ICMP (RFC 1071).
///
/// Soma palavras de 16 bits formadas por pares little-endian (byte baixo +
/// byte alto << 8); um byte final ímpar entra com byte alto zero. O resultado
/// deve ser gravado no pacote com `to_le_bytes`, o que equivale ao checksum
/// em ordem de rede.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u64 = 0;
    let mut words = data.chunks_exact(2);
    for w in &mut words {
        sum += u16::from_le_bytes([w[0], w[1]]) as u64;
    }
    if let [last] = words.remainder() {
        sum += *last as u64;
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Cabeçalho Echo como trafega na rede, campos multi-byte em big-endian:
///
/// ```text
/// 0      1      2             4             6             8                   16
/// | type | code |  checksum   | identifier  |  sequence   | timestamp (u64 s)  |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub ident: u16,
    pub seq: u16,
    pub timestamp: u64,
}

impl EchoHeader {
    pub fn encode(&self) -> [u8; ECHO_HEADER_LEN] {
        let mut buf = [0u8; ECHO_HEADER_LEN];
        buf[0] = self.icmp_type;
        buf[1] = self.code;
        buf[2..4].copy_from_slice(&self.checksum.to_be_bytes());
        buf[4..6].copy_from_slice(&self.ident.to_be_bytes());
        buf[6..8].copy_from_slice(&self.seq.to_be_bytes());
        buf[8..16].copy_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    /// Lê o cabeçalho do início de `buf`; `None` se não houver bytes suficientes.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let h = buf.get(..ECHO_HEADER_LEN)?;
        Some(EchoHeader {
            icmp_type: h[0],
            code: h[1],
            checksum: u16::from_be_bytes([h[2], h[3]]),
            ident: u16::from_be_bytes([h[4], h[5]]),
            seq: u16::from_be_bytes([h[6], h[7]]),
            timestamp: u64::from_be_bytes([h[8], h[9], h[10], h[11], h[12], h[13], h[14], h[15]]),
        })
    }
}

// Tupla crua usada no modo verboso
impl fmt::Display for EchoHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {})",
            self.icmp_type, self.code, self.checksum, self.ident, self.seq, self.timestamp
        )
    }
}

/// Echo Request pronto para envio: cabeçalho final e bytes serializados.
#[derive(Debug, Clone)]
pub struct EchoRequest {
    pub header: EchoHeader,
    pub packet: Vec<u8>,
}

impl EchoRequest {
    /// Monta um pacote ICMPv4 Echo Request (type=8, code=0) com checksum.
    pub fn new(ident: u16, seq: u16, timestamp: u64, payload: &[u8]) -> Self {
        let mut header = EchoHeader {
            icmp_type: ECHO_REQUEST,
            code: 0,
            checksum: 0,
            ident,
            seq,
            timestamp,
        };

        let mut packet = Vec::with_capacity(ECHO_HEADER_LEN + payload.len());
        packet.extend_from_slice(&header.encode());
        packet.extend_from_slice(payload);

        // Checksum calculado com o campo zerado, depois reserializa o cabeçalho
        header.checksum = checksum(&packet).swap_bytes();
        packet[..ECHO_HEADER_LEN].copy_from_slice(&header.encode());

        EchoRequest { header, packet }
    }
}

/// Datagrama IPv4 recebido no socket RAW, já separado em IP + ICMP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub source: Ipv4Addr,
    pub ip_header_len: usize,
    pub ttl: u8,
    pub header: EchoHeader,
}

/// Interpreta um datagrama IPv4 completo.
///
/// O tamanho do cabeçalho IP vem do IHL (nibble baixo do primeiro byte) vezes
/// 4, já que opções IP podem estar presentes. Retorna `None` para qualquer
/// coisa que não seja IPv4 ou que seja curta demais para conter um Echo.
pub fn parse_reply(datagram: &[u8]) -> Option<EchoReply> {
    let first = *datagram.first()?;
    if first >> 4 != 4 {
        return None;
    }
    let ip_header_len = (first & 0x0F) as usize * 4;
    if ip_header_len < MIN_IPV4_HEADER_LEN || datagram.len() < ip_header_len {
        return None;
    }

    let header = EchoHeader::decode(&datagram[ip_header_len..])?;
    Some(EchoReply {
        source: Ipv4Addr::new(datagram[12], datagram[13], datagram[14], datagram[15]),
        ip_header_len,
        ttl: datagram[8],
        header,
    })
}
