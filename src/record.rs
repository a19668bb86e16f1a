//! Record schema registry.
//!
//! Maps each supported record type to the zone container holding it and to a
//! constructor that turns a domain plus positional arguments into a typed
//! [`Record`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZoneError};

/// The ten record types the engine can mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address.
    A,
    /// IPv6 address.
    Aaaa,
    /// Delegation.
    Ns,
    /// Canonical name.
    Cname,
    /// Mail exchanger.
    Mx,
    /// Reverse pointer.
    Ptr,
    /// Free-form text.
    Txt,
    /// Service locator.
    Srv,
    /// Sender policy (legacy type 99).
    Spf,
    /// Certification authority authorization.
    Caa,
}

impl RecordType {
    /// All supported types, in zone generation order.
    pub const ALL: [RecordType; 10] = [
        RecordType::Ns,
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Ptr,
        RecordType::Txt,
        RecordType::Srv,
        RecordType::Spf,
        RecordType::Caa,
    ];

    /// Look up a type by its canonical uppercase tag.
    ///
    /// Lookup is case-sensitive; callers normalize case first.
    pub fn from_tag(tag: &str) -> Result<Self> {
        let rtype = match tag {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "NS" => RecordType::Ns,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "PTR" => RecordType::Ptr,
            "TXT" => RecordType::Txt,
            "SRV" => RecordType::Srv,
            "SPF" => RecordType::Spf,
            "CAA" => RecordType::Caa,
            other => return Err(ZoneError::UnknownRecordType(other.to_string())),
        };
        Ok(rtype)
    }

    /// Canonical uppercase tag.
    pub fn tag(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Ns => "NS",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ptr => "PTR",
            RecordType::Txt => "TXT",
            RecordType::Srv => "SRV",
            RecordType::Spf => "SPF",
            RecordType::Caa => "CAA",
        }
    }

    /// Name of the zone container holding records of this type.
    pub fn container(self) -> &'static str {
        match self {
            RecordType::A => "a",
            RecordType::Aaaa => "aaaa",
            RecordType::Ns => "ns",
            RecordType::Cname => "cname",
            RecordType::Mx => "mx",
            RecordType::Ptr => "ptr",
            RecordType::Txt => "txt",
            RecordType::Srv => "srv",
            RecordType::Spf => "spf",
            RecordType::Caa => "caa",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Explicit TTL of a single record.
///
/// Not part of a record's identity: records that differ only in TTL compare
/// equal, so add and delete match on record data alone.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ttl(pub Option<u32>);

impl Ttl {
    /// Whether the record inherits the zone's `$TTL`.
    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }
}

impl PartialEq for Ttl {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Ttl {}

/// A or AAAA record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Owner name.
    pub name: String,
    /// Address, kept verbatim.
    pub ip: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// NS or PTR record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Owner name.
    pub name: String,
    /// Target host.
    pub host: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// CNAME record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnameRecord {
    /// Owner name.
    pub name: String,
    /// Canonical target.
    pub alias: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// MX record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    /// Owner name.
    pub name: String,
    /// Lower is preferred.
    pub preference: u16,
    /// Mail exchanger host.
    pub host: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// TXT record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtRecord {
    /// Owner name.
    pub name: String,
    /// Text data as space separated quoted character-strings.
    pub txt: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// SRV record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvRecord {
    /// Owner name.
    pub name: String,
    /// Priority.
    pub priority: u16,
    /// Weight.
    pub weight: u16,
    /// Port.
    pub port: u16,
    /// Target host.
    pub target: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// SPF record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpfRecord {
    /// Owner name.
    pub name: String,
    /// Policy data, quoted like TXT data.
    pub data: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// CAA record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaaRecord {
    /// Owner name.
    pub name: String,
    /// Flags octet.
    pub flags: u8,
    /// Property tag (issue, issuewild, iodef...).
    pub tag: String,
    /// Property value, unescaped and without surrounding quotes.
    pub value: String,
    /// Explicit TTL.
    #[serde(default, skip_serializing_if = "Ttl::is_unset")]
    pub ttl: Ttl,
}

/// A typed record of one of the supported types.
///
/// Equality is structural over the record data; it is what add/delete use
/// to decide membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A record.
    A(AddressRecord),
    /// AAAA record.
    Aaaa(AddressRecord),
    /// NS record.
    Ns(HostRecord),
    /// CNAME record.
    Cname(CnameRecord),
    /// MX record.
    Mx(MxRecord),
    /// PTR record.
    Ptr(HostRecord),
    /// TXT record.
    Txt(TxtRecord),
    /// SRV record.
    Srv(SrvRecord),
    /// SPF record.
    Spf(SpfRecord),
    /// CAA record.
    Caa(CaaRecord),
}

impl Record {
    /// Build a record from a domain and positional arguments.
    ///
    /// Every field is checked to be writable back to a master file: names,
    /// hosts and addresses are single plain tokens, TXT and SPF data is
    /// either unquoted text or complete quoted strings.
    pub fn construct<S: AsRef<str>>(rtype: RecordType, domain: &str, args: &[S]) -> Result<Self> {
        let name = owner_name(domain)?;
        let token = |field: &'static str, i: usize| plain_token(field, args[i].as_ref());
        let ttl = Ttl::default();

        let record = match rtype {
            RecordType::A => {
                expect_arity(rtype, args, 1)?;
                Record::A(AddressRecord {
                    name,
                    ip: token("ip", 0)?,
                    ttl,
                })
            }
            RecordType::Aaaa => {
                expect_arity(rtype, args, 1)?;
                Record::Aaaa(AddressRecord {
                    name,
                    ip: token("ip", 0)?,
                    ttl,
                })
            }
            RecordType::Ns => {
                expect_arity(rtype, args, 1)?;
                Record::Ns(HostRecord {
                    name,
                    host: token("host", 0)?,
                    ttl,
                })
            }
            RecordType::Cname => {
                expect_arity(rtype, args, 1)?;
                Record::Cname(CnameRecord {
                    name,
                    alias: token("alias", 0)?,
                    ttl,
                })
            }
            RecordType::Mx => {
                expect_arity(rtype, args, 2)?;
                Record::Mx(MxRecord {
                    name,
                    preference: parse_number("preference", args[0].as_ref())?,
                    host: token("host", 1)?,
                    ttl,
                })
            }
            RecordType::Ptr => {
                expect_arity(rtype, args, 1)?;
                Record::Ptr(HostRecord {
                    name,
                    host: token("host", 0)?,
                    ttl,
                })
            }
            RecordType::Txt => {
                // Variadic, but at least one token.
                if args.is_empty() {
                    expect_arity(rtype, args, 1)?;
                }
                let joined = args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
                Record::Txt(TxtRecord {
                    name,
                    txt: character_strings("txt", &joined)?,
                    ttl,
                })
            }
            RecordType::Srv => {
                expect_arity(rtype, args, 4)?;
                Record::Srv(SrvRecord {
                    name,
                    priority: parse_number("priority", args[0].as_ref())?,
                    weight: parse_number("weight", args[1].as_ref())?,
                    port: parse_number("port", args[2].as_ref())?,
                    target: token("target", 3)?,
                    ttl,
                })
            }
            RecordType::Spf => {
                expect_arity(rtype, args, 1)?;
                Record::Spf(SpfRecord {
                    name,
                    data: character_strings("data", args[0].as_ref())?,
                    ttl,
                })
            }
            RecordType::Caa => {
                expect_arity(rtype, args, 3)?;
                Record::Caa(CaaRecord {
                    name,
                    flags: parse_number("flags", args[0].as_ref())?,
                    tag: caa_tag(args[1].as_ref())?,
                    value: strip_quotes(args[2].as_ref()).to_string(),
                    ttl,
                })
            }
        };

        Ok(record)
    }

    /// Split a value string on whitespace and construct the record.
    pub fn parse_value(rtype: RecordType, domain: &str, value: &str) -> Result<Self> {
        let args: Vec<&str> = value.split_whitespace().collect();
        Self::construct(rtype, domain, &args)
    }

    /// Build a record from master-file tokens, as produced by the zone
    /// tokenizer (quoted strings arrive as single tokens, quotes included).
    pub(crate) fn from_master_tokens(
        rtype: RecordType,
        owner: &str,
        rdata: &[String],
        ttl: Option<u32>,
    ) -> Result<Self> {
        let record = match rtype {
            // Each token is one character-string.
            RecordType::Txt | RecordType::Spf => {
                if rdata.is_empty() {
                    expect_arity(rtype, rdata, 1)?;
                }
                let name = owner_name(owner)?;
                let data = rdata
                    .iter()
                    .map(|t| if t.starts_with('"') { t.clone() } else { format!("\"{}\"", t) })
                    .collect::<Vec<_>>()
                    .join(" ");
                let ttl = Ttl::default();
                match rtype {
                    RecordType::Txt => Record::Txt(TxtRecord { name, txt: data, ttl }),
                    _ => Record::Spf(SpfRecord { name, data, ttl }),
                }
            }
            RecordType::Caa => {
                expect_arity(rtype, rdata, 3)?;
                Record::Caa(CaaRecord {
                    name: owner_name(owner)?,
                    flags: parse_number("flags", &rdata[0])?,
                    tag: caa_tag(&rdata[1])?,
                    value: unescape(&rdata[2]),
                    ttl: Ttl::default(),
                })
            }
            _ => Self::construct(rtype, owner, rdata)?,
        };
        Ok(record.with_ttl(ttl))
    }

    /// Type of this record.
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::A(_) => RecordType::A,
            Record::Aaaa(_) => RecordType::Aaaa,
            Record::Ns(_) => RecordType::Ns,
            Record::Cname(_) => RecordType::Cname,
            Record::Mx(_) => RecordType::Mx,
            Record::Ptr(_) => RecordType::Ptr,
            Record::Txt(_) => RecordType::Txt,
            Record::Srv(_) => RecordType::Srv,
            Record::Spf(_) => RecordType::Spf,
            Record::Caa(_) => RecordType::Caa,
        }
    }

    /// Owner name.
    pub fn name(&self) -> &str {
        match self {
            Record::A(r) | Record::Aaaa(r) => &r.name,
            Record::Ns(r) | Record::Ptr(r) => &r.name,
            Record::Cname(r) => &r.name,
            Record::Mx(r) => &r.name,
            Record::Txt(r) => &r.name,
            Record::Srv(r) => &r.name,
            Record::Spf(r) => &r.name,
            Record::Caa(r) => &r.name,
        }
    }

    /// Explicit TTL, if the record has one.
    pub fn ttl(&self) -> Option<u32> {
        match self {
            Record::A(r) | Record::Aaaa(r) => r.ttl.0,
            Record::Ns(r) | Record::Ptr(r) => r.ttl.0,
            Record::Cname(r) => r.ttl.0,
            Record::Mx(r) => r.ttl.0,
            Record::Txt(r) => r.ttl.0,
            Record::Srv(r) => r.ttl.0,
            Record::Spf(r) => r.ttl.0,
            Record::Caa(r) => r.ttl.0,
        }
    }

    /// Replace the explicit TTL.
    pub fn with_ttl(mut self, ttl: Option<u32>) -> Self {
        let slot = match &mut self {
            Record::A(r) | Record::Aaaa(r) => &mut r.ttl,
            Record::Ns(r) | Record::Ptr(r) => &mut r.ttl,
            Record::Cname(r) => &mut r.ttl,
            Record::Mx(r) => &mut r.ttl,
            Record::Txt(r) => &mut r.ttl,
            Record::Srv(r) => &mut r.ttl,
            Record::Spf(r) => &mut r.ttl,
            Record::Caa(r) => &mut r.ttl,
        };
        *slot = Ttl(ttl);
        self
    }

    /// Record data in master-file presentation form.
    pub fn rdata(&self) -> String {
        match self {
            Record::A(r) | Record::Aaaa(r) => r.ip.clone(),
            Record::Ns(r) | Record::Ptr(r) => r.host.clone(),
            Record::Cname(r) => r.alias.clone(),
            Record::Mx(r) => format!("{} {}", r.preference, r.host),
            Record::Txt(r) => r.txt.clone(),
            Record::Srv(r) => format!("{} {} {} {}", r.priority, r.weight, r.port, r.target),
            Record::Spf(r) => r.data.clone(),
            Record::Caa(r) => format!("{} {} {}", r.flags, r.tag, quote(&r.value)),
        }
    }
}

fn expect_arity<S>(rtype: RecordType, args: &[S], expected: usize) -> Result<()> {
    if args.len() == expected {
        return Ok(());
    }
    Err(ZoneError::ArityMismatch {
        rtype: rtype.tag(),
        expected,
        got: args.len(),
    })
}

fn parse_number<T: std::str::FromStr>(field: &'static str, token: &str) -> Result<T> {
    token.parse().map_err(|_| ZoneError::InvalidFieldValue {
        field,
        value: token.to_string(),
    })
}

fn invalid(field: &'static str, value: &str) -> ZoneError {
    ZoneError::InvalidFieldValue {
        field,
        value: value.to_string(),
    }
}

/// A token that can be written unquoted: non-empty, no whitespace, none of
/// the master-file delimiters, and no dangling backslash.
fn plain_token(field: &'static str, token: &str) -> Result<String> {
    if token.is_empty() {
        return Err(invalid(field, token));
    }
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.next().is_none() => return Err(invalid(field, token)),
            '\\' => {}
            ';' | '(' | ')' | '"' => return Err(invalid(field, token)),
            c if c.is_whitespace() => return Err(invalid(field, token)),
            _ => {}
        }
    }
    Ok(token.to_string())
}

/// Owner names are plain tokens that would not be read as a directive.
fn owner_name(domain: &str) -> Result<String> {
    if domain.starts_with('$') {
        return Err(invalid("name", domain));
    }
    plain_token("name", domain)
}

/// CAA property tags are alphanumeric.
fn caa_tag(tag: &str) -> Result<String> {
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("tag", tag));
    }
    Ok(tag.to_string())
}

/// Normalize TXT-style data to space separated quoted character-strings.
///
/// Text without any double quote is one literal string. Otherwise it must be
/// a sequence of complete quoted strings, which are kept as written.
fn character_strings(field: &'static str, text: &str) -> Result<String> {
    if !text.contains('"') {
        return Ok(quote(text));
    }

    let mut strings = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c != '"' {
            return Err(invalid(field, text));
        }
        chars.next();

        let mut end = None;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    if chars.next().is_none() {
                        return Err(invalid(field, text));
                    }
                }
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| invalid(field, text))?;
        if chars.peek().is_some_and(|&(_, c)| !c.is_whitespace()) {
            return Err(invalid(field, text));
        }
        strings.push(&text[start..=end]);
    }

    Ok(strings.join(" "))
}

/// Quote a literal string, escaping `"` and `\`.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Inverse of [`quote`]; also accepts unquoted tokens and `\DDD` escapes.
fn unescape(token: &str) -> String {
    let inner = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let digits: String = std::iter::from_fn(|| chars.next_if(char::is_ascii_digit))
            .take(3)
            .collect();
        match digits.len() {
            0 => out.extend(chars.next()),
            3 => match digits.parse::<u8>() {
                Ok(byte) => out.push(char::from(byte)),
                Err(_) => {
                    out.push('\\');
                    out.push_str(&digits);
                }
            },
            _ => out.push_str(&digits),
        }
    }
    out
}

/// Strip one pair of surrounding double quotes when the interior is non-empty.
fn strip_quotes(value: &str) -> &str {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) if !inner.is_empty() => inner,
        _ => value,
    }
}
