//! Structured zone representation and the master-file codec.
//!
//! [`BindZoneCodec`] understands the part of the BIND master-file format the
//! engine manipulates:
//! - `$ORIGIN` and `$TTL` directives
//! - `;` comments outside quoted strings
//! - parenthesised multi-line records (typically the SOA)
//! - continuation lines that inherit the previous owner
//! - optional per-record TTL (kept and written back) and class tokens
//!
//! `$ORIGIN` and `$TTL` must come before the first record and appear at most
//! once, since the generator writes them once at the top. Anything else
//! (other record types, `$INCLUDE`, `$GENERATE`, repeated or late directives)
//! is rejected so that a zone is never rewritten with records silently
//! dropped or moved.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZoneError};
use crate::record::{
    AddressRecord, CaaRecord, CnameRecord, HostRecord, MxRecord, Record, RecordType, SpfRecord,
    SrvRecord, TxtRecord,
};

/// SOA block of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Soa {
    /// Owner name, usually `@`.
    pub name: String,
    /// Explicit TTL on the SOA line, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Primary nameserver.
    pub mname: String,
    /// Responsible mailbox in DNS form.
    pub rname: String,
    /// Zone serial.
    pub serial: u32,
    /// Refresh interval in seconds.
    pub refresh: u32,
    /// Retry interval in seconds.
    pub retry: u32,
    /// Expire time in seconds.
    pub expire: u32,
    /// Negative caching TTL in seconds.
    pub minimum: u32,
}

impl Default for Soa {
    fn default() -> Self {
        Self {
            name: "@".to_string(),
            ttl: None,
            mname: "ns1.example.com.".to_string(),
            rname: "admin.example.com.".to_string(),
            serial: 1,
            refresh: 3600,
            retry: 600,
            expire: 604800,
            minimum: 60,
        }
    }
}

/// One zone in memory: SOA plus one container per supported record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneFile {
    /// `$ORIGIN` directive.
    #[serde(rename = "$origin", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// `$TTL` directive.
    #[serde(rename = "$ttl", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Start of authority.
    pub soa: Soa,
    /// NS records.
    #[serde(default)]
    pub ns: Vec<HostRecord>,
    /// A records.
    #[serde(default)]
    pub a: Vec<AddressRecord>,
    /// AAAA records.
    #[serde(default)]
    pub aaaa: Vec<AddressRecord>,
    /// CNAME records.
    #[serde(default)]
    pub cname: Vec<CnameRecord>,
    /// MX records.
    #[serde(default)]
    pub mx: Vec<MxRecord>,
    /// PTR records.
    #[serde(default)]
    pub ptr: Vec<HostRecord>,
    /// TXT records.
    #[serde(default)]
    pub txt: Vec<TxtRecord>,
    /// SRV records.
    #[serde(default)]
    pub srv: Vec<SrvRecord>,
    /// SPF records.
    #[serde(default)]
    pub spf: Vec<SpfRecord>,
    /// CAA records.
    #[serde(default)]
    pub caa: Vec<CaaRecord>,
}

impl ZoneFile {
    /// Insert a record unless a structurally equal one is already present.
    ///
    /// Returns `true` if the zone changed.
    pub fn insert(&mut self, record: Record) -> bool {
        match record {
            Record::A(r) => append_if_absent(&mut self.a, r),
            Record::Aaaa(r) => append_if_absent(&mut self.aaaa, r),
            Record::Ns(r) => append_if_absent(&mut self.ns, r),
            Record::Cname(r) => append_if_absent(&mut self.cname, r),
            Record::Mx(r) => append_if_absent(&mut self.mx, r),
            Record::Ptr(r) => append_if_absent(&mut self.ptr, r),
            Record::Txt(r) => append_if_absent(&mut self.txt, r),
            Record::Srv(r) => append_if_absent(&mut self.srv, r),
            Record::Spf(r) => append_if_absent(&mut self.spf, r),
            Record::Caa(r) => append_if_absent(&mut self.caa, r),
        }
    }

    /// Append a record, keeping duplicates as they appear in the source.
    fn push(&mut self, record: Record) {
        match record {
            Record::A(r) => self.a.push(r),
            Record::Aaaa(r) => self.aaaa.push(r),
            Record::Ns(r) => self.ns.push(r),
            Record::Cname(r) => self.cname.push(r),
            Record::Mx(r) => self.mx.push(r),
            Record::Ptr(r) => self.ptr.push(r),
            Record::Txt(r) => self.txt.push(r),
            Record::Srv(r) => self.srv.push(r),
            Record::Spf(r) => self.spf.push(r),
            Record::Caa(r) => self.caa.push(r),
        }
    }

    /// Remove the first record structurally equal to `record`.
    ///
    /// Returns `true` if the zone changed.
    pub fn remove(&mut self, record: &Record) -> bool {
        match record {
            Record::A(r) => remove_first(&mut self.a, r),
            Record::Aaaa(r) => remove_first(&mut self.aaaa, r),
            Record::Ns(r) => remove_first(&mut self.ns, r),
            Record::Cname(r) => remove_first(&mut self.cname, r),
            Record::Mx(r) => remove_first(&mut self.mx, r),
            Record::Ptr(r) => remove_first(&mut self.ptr, r),
            Record::Txt(r) => remove_first(&mut self.txt, r),
            Record::Srv(r) => remove_first(&mut self.srv, r),
            Record::Spf(r) => remove_first(&mut self.spf, r),
            Record::Caa(r) => remove_first(&mut self.caa, r),
        }
    }

    /// Records of one type, in container order.
    pub fn records(&self, rtype: RecordType) -> Vec<Record> {
        match rtype {
            RecordType::A => self.a.iter().cloned().map(Record::A).collect(),
            RecordType::Aaaa => self.aaaa.iter().cloned().map(Record::Aaaa).collect(),
            RecordType::Ns => self.ns.iter().cloned().map(Record::Ns).collect(),
            RecordType::Cname => self.cname.iter().cloned().map(Record::Cname).collect(),
            RecordType::Mx => self.mx.iter().cloned().map(Record::Mx).collect(),
            RecordType::Ptr => self.ptr.iter().cloned().map(Record::Ptr).collect(),
            RecordType::Txt => self.txt.iter().cloned().map(Record::Txt).collect(),
            RecordType::Srv => self.srv.iter().cloned().map(Record::Srv).collect(),
            RecordType::Spf => self.spf.iter().cloned().map(Record::Spf).collect(),
            RecordType::Caa => self.caa.iter().cloned().map(Record::Caa).collect(),
        }
    }

    /// Total number of records across all containers.
    pub fn record_count(&self) -> usize {
        self.a.len()
            + self.aaaa.len()
            + self.ns.len()
            + self.cname.len()
            + self.mx.len()
            + self.ptr.len()
            + self.txt.len()
            + self.srv.len()
            + self.spf.len()
            + self.caa.len()
    }

    /// Advance the SOA serial by one and return the new value.
    pub fn bump_serial(&mut self) -> u32 {
        self.soa.serial = self.soa.serial.wrapping_add(1);
        self.soa.serial
    }
}

fn append_if_absent<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        return false;
    }
    items.push(item);
    true
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, item: &T) -> bool {
    match items.iter().position(|existing| existing == item) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

/// Converts zone text to a [`ZoneFile`] and back.
///
/// `generate(parse(text))` must be semantically equivalent to `text` for
/// everything the engine manipulates.
pub trait ZoneCodec: Send + Sync {
    /// Parse zone text.
    fn parse(&self, text: &str) -> Result<ZoneFile>;

    /// Render a zone as text.
    fn generate(&self, zone: &ZoneFile) -> String;
}

/// Codec for BIND master files.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindZoneCodec;

impl ZoneCodec for BindZoneCodec {
    fn parse(&self, text: &str) -> Result<ZoneFile> {
        let mut origin = None;
        let mut default_ttl = None;
        let mut soa = None;
        let mut zone = ZoneFile::default();
        let mut last_owner: Option<String> = None;
        let mut seen_record = false;

        for entry in entries(text)? {
            let line = entry.line;
            let mut tokens = entry.tokens.as_slice();

            if let Some(directive) = tokens.first().filter(|t| t.starts_with('$')) {
                let arg = tokens
                    .get(1)
                    .ok_or_else(|| ZoneError::parse(line, format!("{} requires a value", directive)))?;
                let directive = directive.to_ascii_uppercase();
                let slot_taken = match directive.as_str() {
                    "$ORIGIN" => origin.is_some(),
                    "$TTL" => default_ttl.is_some(),
                    other => {
                        return Err(ZoneError::parse(line, format!("unsupported directive {}", other)))
                    }
                };
                if slot_taken {
                    return Err(ZoneError::parse(line, format!("repeated {}", directive)));
                }
                if seen_record {
                    return Err(ZoneError::parse(
                        line,
                        format!("{} after the first record", directive),
                    ));
                }
                if directive == "$ORIGIN" {
                    origin = Some(arg.clone());
                } else {
                    default_ttl = Some(parse_ttl(arg, line)?);
                }
                continue;
            }

            let owner = if entry.inherits_owner {
                last_owner
                    .clone()
                    .ok_or_else(|| ZoneError::parse(line, "record without an owner name"))?
            } else {
                let (owner, rest) = tokens
                    .split_first()
                    .ok_or_else(|| ZoneError::parse(line, "empty record"))?;
                tokens = rest;
                owner.clone()
            };
            last_owner = Some(owner.clone());
            seen_record = true;

            // TTL and class may appear in either order before the type.
            let mut ttl = None;
            for _ in 0..2 {
                match tokens.first() {
                    Some(t) if t.eq_ignore_ascii_case("IN") => tokens = &tokens[1..],
                    Some(t) if t.starts_with(|c: char| c.is_ascii_digit()) && ttl.is_none() => {
                        ttl = Some(parse_ttl(t, line)?);
                        tokens = &tokens[1..];
                    }
                    _ => break,
                }
            }

            let (rtype, rdata) = tokens
                .split_first()
                .ok_or_else(|| ZoneError::parse(line, "missing record type"))?;
            let rtype = rtype.to_ascii_uppercase();

            if rtype == "SOA" {
                if soa.is_some() {
                    return Err(ZoneError::parse(line, "duplicate SOA record"));
                }
                soa = Some(parse_soa(owner, ttl, rdata, line)?);
                continue;
            }

            let rtype = RecordType::from_tag(&rtype)
                .map_err(|_| ZoneError::parse(line, format!("unsupported record type {}", rtype)))?;
            let record = Record::from_master_tokens(rtype, &owner, rdata, ttl)
                .map_err(|e| ZoneError::parse(line, e.to_string()))?;
            zone.push(record);
        }

        zone.origin = origin;
        zone.ttl = default_ttl;
        zone.soa = soa.ok_or_else(|| ZoneError::parse(0, "zone has no SOA record"))?;
        Ok(zone)
    }

    fn generate(&self, zone: &ZoneFile) -> String {
        let mut out = String::new();

        if let Some(origin) = &zone.origin {
            let _ = writeln!(out, "$ORIGIN {}", origin);
        }
        if let Some(ttl) = zone.ttl {
            let _ = writeln!(out, "$TTL {}", ttl);
        }
        if !out.is_empty() {
            out.push('\n');
        }

        let soa = &zone.soa;
        let ttl = soa.ttl.map(|t| format!("{}\t", t)).unwrap_or_default();
        let _ = writeln!(out, "; SOA Record");
        let _ = writeln!(
            out,
            "{}\t{}IN\tSOA\t{} {} (\n\t\t{}\t; serial\n\t\t{}\t; refresh\n\t\t{}\t; retry\n\t\t{}\t; expire\n\t\t{}\t; minimum\n)",
            soa.name, ttl, soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
        );

        for rtype in RecordType::ALL {
            let records = zone.records(rtype);
            if records.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n; {} Records", rtype);
            for record in &records {
                let _ = match record.ttl() {
                    Some(ttl) => writeln!(
                        out,
                        "{}\t{}\tIN\t{}\t{}",
                        record.name(),
                        ttl,
                        rtype,
                        record.rdata()
                    ),
                    None => writeln!(out, "{}\tIN\t{}\t{}", record.name(), rtype, record.rdata()),
                };
            }
        }

        out
    }
}

/// One logical record or directive, possibly spanning several lines.
#[derive(Debug)]
struct Entry {
    line: usize,
    inherits_owner: bool,
    tokens: Vec<String>,
}

fn entries(text: &str) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut current: Option<Entry> = None;
    let mut depth = 0usize;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize(raw, line, &mut depth)?;

        match current.as_mut() {
            Some(entry) => entry.tokens.extend(tokens),
            None if tokens.is_empty() => continue,
            None => {
                current = Some(Entry {
                    line,
                    inherits_owner: raw.starts_with(|c: char| c == ' ' || c == '\t'),
                    tokens,
                })
            }
        }

        if depth == 0 {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
        }
    }

    if depth > 0 {
        let line = current.map(|e| e.line).unwrap_or(0);
        return Err(ZoneError::parse(line, "unbalanced parentheses"));
    }

    Ok(entries)
}

fn tokenize(raw: &str, line: usize, depth: &mut usize) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ';' => break,
            '(' => {
                *depth += 1;
                chars.next();
            }
            ')' => {
                *depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ZoneError::parse(line, "unexpected ')'"))?;
                chars.next();
            }
            '"' => {
                let mut token = String::from('"');
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    token.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            token.push(escaped);
                        }
                    } else if c == '"' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ZoneError::parse(line, "unterminated quoted string"));
                }
                tokens.push(token);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, ';' | '(' | ')' | '"') {
                        break;
                    }
                    token.push(c);
                    chars.next();
                    if c == '\\' {
                        let escaped = chars
                            .next()
                            .ok_or_else(|| ZoneError::parse(line, "dangling escape"))?;
                        token.push(escaped);
                    }
                }
                tokens.push(token);
            }
        }
    }

    Ok(tokens)
}

/// Parse a TTL, accepting BIND unit suffixes (`1h30m`, `2d`, `1w`).
fn parse_ttl(token: &str, line: usize) -> Result<u32> {
    if let Ok(seconds) = token.parse::<u32>() {
        return Ok(seconds);
    }

    let invalid = || ZoneError::parse(line, format!("invalid TTL {:?}", token));
    let mut total: u32 = 0;
    let mut digits = String::new();
    for c in token.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604800,
            _ => return Err(invalid()),
        };
        let value: u32 = digits.parse().map_err(|_| invalid())?;
        total = value
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

fn parse_soa(name: String, ttl: Option<u32>, rdata: &[String], line: usize) -> Result<Soa> {
    if rdata.len() != 7 {
        return Err(ZoneError::parse(
            line,
            format!("SOA expects 7 fields, got {}", rdata.len()),
        ));
    }
    let serial = rdata[2]
        .parse()
        .map_err(|_| ZoneError::parse(line, format!("invalid SOA serial {:?}", rdata[2])))?;

    Ok(Soa {
        name,
        ttl,
        mname: rdata[0].clone(),
        rname: rdata[1].clone(),
        serial,
        refresh: parse_ttl(&rdata[3], line)?,
        retry: parse_ttl(&rdata[4], line)?,
        expire: parse_ttl(&rdata[5], line)?,
        minimum: parse_ttl(&rdata[6], line)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONE: &str = r#"$ORIGIN example.com.
$TTL 3600
@   IN  SOA ns1.example.com. hostmaster.example.com. (
        2024010101 ; serial
        1h         ; refresh
        600        ; retry
        1w         ; expire
        300 )      ; minimum

@           IN  NS      ns1.example.com.
            IN  NS      ns2.example.com.
@           IN  MX      10 mail.example.com.
www     300 IN  A       10.0.0.5
www         IN  AAAA    fd00::5
ftp         IN  CNAME   www
@           IN  TXT     "v=spf1 include:_spf.example.com -all" ; policy
_sip._tcp   IN  SRV     10 5 5060 sip.example.com.
@           IN  CAA     0 issue "letsencrypt.org"
5           IN  PTR     host.example.com.
"#;

    #[test]
    fn test_parse_representative_zone() {
        let zone = BindZoneCodec.parse(ZONE).unwrap();

        assert_eq!(zone.origin.as_deref(), Some("example.com."));
        assert_eq!(zone.ttl, Some(3600));
        assert_eq!(zone.soa.serial, 2024010101);
        assert_eq!(zone.soa.refresh, 3600);
        assert_eq!(zone.soa.expire, 604800);
        assert_eq!(zone.soa.minimum, 300);

        assert_eq!(zone.ns.len(), 2);
        assert_eq!(zone.ns[1].name, "@");
        assert_eq!(zone.mx[0].preference, 10);
        assert_eq!(zone.a[0].ip, "10.0.0.5");
        assert_eq!(zone.txt[0].txt, "\"v=spf1 include:_spf.example.com -all\"");
        assert_eq!(zone.srv[0].port, 5060);
        assert_eq!(zone.caa[0].value, "letsencrypt.org");
        assert_eq!(zone.ptr[0].name, "5");
        assert_eq!(zone.record_count(), 10);
    }

    #[test]
    fn test_generate_then_parse_is_stable() {
        let zone = BindZoneCodec.parse(ZONE).unwrap();
        let text = BindZoneCodec.generate(&zone);
        let reparsed = BindZoneCodec.parse(&text).unwrap();
        assert_eq!(zone, reparsed);
        assert!(text.contains("www\t300\tIN\tA\t10.0.0.5"));
        assert_eq!(reparsed.a[0].ttl.0, Some(300));
        assert!(reparsed.aaaa[0].ttl.is_unset());
        assert!(text.contains("@\tIN\tCAA\t0 issue \"letsencrypt.org\""));
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        let text = "@ IN SOA a. b. 1 2 3 4 5\n@ IN DNSKEY 257 3 8 AwEAAa\n";
        let err = BindZoneCodec.parse(text).unwrap_err();
        assert!(matches!(err, ZoneError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_missing_soa_is_rejected() {
        let err = BindZoneCodec.parse("www IN A 10.0.0.1\n").unwrap_err();
        assert!(matches!(err, ZoneError::Parse { .. }));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = BindZoneCodec.parse("@ IN SOA a. b. ( 1 2 3 4 5\n").unwrap_err();
        assert!(matches!(err, ZoneError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_insert_and_remove_are_idempotent() {
        let mut zone = ZoneFile::default();
        let record = Record::parse_value(RecordType::A, "www", "10.0.0.5").unwrap();

        assert!(zone.insert(record.clone()));
        assert!(!zone.insert(record.clone()));
        assert_eq!(zone.records(RecordType::A), vec![record.clone()]);

        assert!(zone.remove(&record));
        assert!(!zone.remove(&record));
        assert!(zone.a.is_empty());
    }

    #[test]
    fn test_remove_takes_first_match_only() {
        let mut zone = ZoneFile::default();
        let record = Record::parse_value(RecordType::Ns, "@", "ns1.example.com.").unwrap();
        zone.ns.push(match record.clone() {
            Record::Ns(r) => r,
            _ => unreachable!(),
        });
        zone.ns.push(zone.ns[0].clone());

        assert!(zone.remove(&record));
        assert_eq!(zone.ns.len(), 1);
    }

    #[test]
    fn test_parse_ttl_units() {
        assert_eq!(parse_ttl("3600", 1).unwrap(), 3600);
        assert_eq!(parse_ttl("1h30m", 1).unwrap(), 5400);
        assert_eq!(parse_ttl("2D", 1).unwrap(), 172800);
        assert!(parse_ttl("10x", 1).is_err());
        assert!(parse_ttl("5m3", 1).is_err());
    }

    #[test]
    fn test_bump_serial_wraps() {
        let mut zone = ZoneFile::default();
        zone.soa.serial = u32::MAX;
        assert_eq!(zone.bump_serial(), 0);
    }

    #[test]
    fn test_second_origin_is_rejected() {
        let text = "$ORIGIN example.com.\n\
                    @ IN SOA a. b. 1 2 3 4 5\n\
                    www IN A 10.0.0.1\n\
                    $ORIGIN sub.example.com.\n\
                    api IN A 10.0.0.2\n";
        let err = BindZoneCodec.parse(text).unwrap_err();
        assert!(matches!(err, ZoneError::Parse { line: 4, .. }), "{:?}", err);
    }

    #[test]
    fn test_late_or_repeated_ttl_is_rejected() {
        let late = "@ IN SOA a. b. 1 2 3 4 5\n$TTL 300\nwww IN A 10.0.0.1\n";
        assert!(matches!(
            BindZoneCodec.parse(late),
            Err(ZoneError::Parse { line: 2, .. })
        ));

        let repeated = "$TTL 300\n$TTL 600\n@ IN SOA a. b. 1 2 3 4 5\n";
        assert!(matches!(
            BindZoneCodec.parse(repeated),
            Err(ZoneError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_duplicate_lines_survive_round_trip() {
        let text = "@ IN SOA a. b. 1 2 3 4 5\nwww IN A 10.0.0.1\nwww IN A 10.0.0.1\n";
        let zone = BindZoneCodec.parse(text).unwrap();
        assert_eq!(zone.a.len(), 2);

        let reparsed = BindZoneCodec.parse(&BindZoneCodec.generate(&zone)).unwrap();
        assert_eq!(reparsed.a.len(), 2);
    }

    #[test]
    fn test_escaped_tokens_are_read_whole() {
        let text = "@ IN SOA a. b. 1 2 3 4 5\n".to_string() + r"weird\;name IN TXT semi\;colon";
        let zone = BindZoneCodec.parse(&text).unwrap();
        assert_eq!(zone.txt[0].name, r"weird\;name");
        assert_eq!(zone.txt[0].txt, r#""semi\;colon""#);

        let err = BindZoneCodec
            .parse("@ IN SOA a. b. 1 2 3 4 5\nx IN A 10.0.0.1\\\n")
            .unwrap_err();
        assert!(matches!(err, ZoneError::Parse { line: 2, .. }));
    }

    /// Values the engine accepts must read back as the same record after
    /// being written.
    #[test]
    fn test_constructed_records_survive_generate_and_parse() {
        let cases = [
            (RecordType::Txt, "dkim._domainkey", "v=DKIM1; k=rsa; p=MIGf"),
            (RecordType::Txt, "@", "\"quoted; (parens)\" \"second\""),
            (RecordType::Txt, "@", "back\\slash \"and\"quote"),
            (RecordType::Txt, "@", "\"\""),
            (RecordType::Spf, "@", "v=spf1;-all"),
            (RecordType::Caa, "@", "0 issue \"\""),
            (RecordType::Caa, "@", "0 issue \"letsencrypt.org\""),
            (RecordType::Caa, "@", "128 iodef mailto:a;b\"c\\d"),
            (RecordType::Mx, "mail", "10 mail.example.com."),
            (RecordType::Srv, "_sip._tcp", "10 60 5060 sip.example.com."),
            (RecordType::Aaaa, "v6", "fd00::1"),
            (RecordType::Cname, "ftp", "www"),
            (RecordType::Ptr, "5", "host.example.com."),
            (RecordType::Ns, "sub", "ns.sub.example.com."),
            (RecordType::A, "escaped\\.label", "10.0.0.9"),
        ];

        let mut zone = BindZoneCodec.parse(ZONE).unwrap();
        let mut added = Vec::new();
        for (rtype, domain, value) in cases {
            let record = match Record::parse_value(rtype, domain, value) {
                Ok(record) => record,
                Err(err) => {
                    // Rejected values never reach the zone.
                    assert!(matches!(err, ZoneError::InvalidFieldValue { .. }), "{}", value);
                    continue;
                }
            };
            zone.insert(record.clone());
            added.push(record);
        }

        let text = BindZoneCodec.generate(&zone);
        let reparsed = BindZoneCodec
            .parse(&text)
            .unwrap_or_else(|e| panic!("{}\n{}", e, text));
        assert_eq!(reparsed, zone);
        for record in &added {
            assert!(
                reparsed.records(record.record_type()).contains(record),
                "{:?} lost in\n{}",
                record,
                text
            );
        }
        assert_eq!(BindZoneCodec.generate(&reparsed), text);
    }
}
