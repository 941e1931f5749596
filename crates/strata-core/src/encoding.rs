#![forbid(unsafe_code)]

//! Byte-encoding switch consumed by the width oracle and the canvas layer.
//!
//! Text handed to the layout engine and stored in canvases is raw bytes in
//! one of three regimes:
//!
//! - [`ByteEncoding::Narrow`]: one byte is one column.
//! - [`ByteEncoding::Wide`]: legacy double-byte CJK encodings where a pair of
//!   high-bit bytes forms one two-column character.
//! - [`ByteEncoding::Utf8`]: full decode with Unicode width and grapheme rules.
//!
//! # Resolution order
//!
//! 1. The innermost scoped override on the current thread
//!    ([`with_encoding`], [`push_encoding`]).
//! 2. The process-wide value ([`set_encoding`], [`init_from_env`]).
//!
//! The process-wide value starts as UTF-8. It is stored in a single atomic so
//! reads never lock; writes follow a single-writer discipline (set it once at
//! startup, or from the one thread that drives rendering). Layout code
//! snapshots the resolved value once per call so a switch never lands in the
//! middle of a computation.
//!
//! # Example
//!
//! ```
//! use strata_core::encoding::{ByteEncoding, EncodingConfig, current_encoding, with_encoding};
//!
//! let narrow = EncodingConfig::from_label("iso-8859-1");
//! with_encoding(narrow, || {
//!     assert_eq!(current_encoding().byte_encoding, ByteEncoding::Narrow);
//! });
//! ```

use std::cell::RefCell;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable that names the byte encoding explicitly.
pub const ENV_ENCODING: &str = "STRATA_ENCODING";
/// Locale variables consulted, in order, for a codeset suffix.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_CTYPE", "LANG"];

/// Double-byte CJK encoding labels handled by the wide regime.
const WIDE_LABELS: &[&str] = &[
    "euc-jp", "euc-kr", "euc-cn", "euc-tw", "gb2312", "gbk", "big5", "cn-gb", "uhc", "eucjp",
    "euckr", "euccn", "euctw", "cncb",
];
const UTF8_LABELS: &[&str] = &["utf-8", "utf8", "utf"];
const LATIN1_LABELS: &[&str] = &[
    "latin1",
    "latin-1",
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "l1",
    "cp819",
];

// ============================================================================
// Encoding Types
// ============================================================================

/// How bytes map to screen columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteEncoding {
    /// One byte per column.
    Narrow,
    /// Paired high-bit bytes form one double-width character.
    Wide,
    /// UTF-8 with Unicode width and grapheme clustering.
    #[default]
    Utf8,
}

impl ByteEncoding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Narrow => "narrow",
            Self::Wide => "wide",
            Self::Utf8 => "utf8",
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Narrow => 0,
            Self::Wide => 1,
            Self::Utf8 => 2,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Narrow,
            1 => Self::Wide,
            _ => Self::Utf8,
        }
    }
}

/// Encoding used when converting Unicode text into canvas bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1: code points up to U+00FF map to a single byte.
    Latin1,
    /// 7-bit ASCII.
    Ascii,
}

impl TargetEncoding {
    /// Append the encoding of `ch` to `out`. Returns `false` (appending
    /// nothing) when the target cannot represent it.
    #[must_use]
    pub fn encode_char(self, ch: char, out: &mut Vec<u8>) -> bool {
        match self {
            Self::Utf8 => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                true
            }
            Self::Latin1 => match u8::try_from(u32::from(ch)) {
                Ok(b) => {
                    out.push(b);
                    true
                }
                Err(_) => false,
            },
            Self::Ascii => {
                if ch.is_ascii() {
                    out.push(ch as u8);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Whether `ch` survives encoding unchanged.
    #[must_use]
    pub fn can_encode(self, ch: char) -> bool {
        match self {
            Self::Utf8 => true,
            Self::Latin1 => u32::from(ch) <= 0xFF,
            Self::Ascii => ch.is_ascii(),
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Utf8 => 0,
            Self::Latin1 => 1,
            Self::Ascii => 2,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::Latin1,
            2 => Self::Ascii,
            _ => Self::Utf8,
        }
    }
}

/// Complete encoding configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingConfig {
    /// Regime used by the width oracle.
    pub byte_encoding: ByteEncoding,
    /// Encoding for converting `&str` into canvas bytes.
    pub target: TargetEncoding,
    /// Convert box-drawing characters to the DEC special graphics set.
    pub dec_special: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self::UTF8
    }
}

impl EncodingConfig {
    /// Full UTF-8 rendering.
    pub const UTF8: Self = Self {
        byte_encoding: ByteEncoding::Utf8,
        target: TargetEncoding::Utf8,
        dec_special: false,
    };

    /// Single-byte ASCII terminal.
    pub const ASCII: Self = Self {
        byte_encoding: ByteEncoding::Narrow,
        target: TargetEncoding::Ascii,
        dec_special: true,
    };

    /// Construct a configuration for a byte regime with its usual target.
    #[must_use]
    pub const fn new(byte_encoding: ByteEncoding) -> Self {
        match byte_encoding {
            ByteEncoding::Utf8 => Self::UTF8,
            ByteEncoding::Narrow | ByteEncoding::Wide => Self {
                byte_encoding,
                target: TargetEncoding::Ascii,
                dec_special: true,
            },
        }
    }

    /// Map a charset label (as terminals and locales name them) to a config.
    ///
    /// Unknown labels fall back to a narrow ASCII terminal.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        let label = label.as_str();
        if UTF8_LABELS.contains(&label) {
            return Self::UTF8;
        }
        if WIDE_LABELS.contains(&label) {
            return Self::new(ByteEncoding::Wide);
        }
        let target = if LATIN1_LABELS.contains(&label) {
            TargetEncoding::Latin1
        } else {
            TargetEncoding::Ascii
        };
        Self {
            byte_encoding: ByteEncoding::Narrow,
            target,
            dec_special: true,
        }
    }

    /// Detect the configuration from the process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Detect the configuration using a custom environment lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(label) = get_env(ENV_ENCODING).filter(|v| !v.trim().is_empty()) {
            return Self::from_label(&label);
        }
        let locale = LOCALE_VARS
            .iter()
            .filter_map(|key| get_env(key))
            .find(|value| !value.is_empty());
        match locale.as_deref().and_then(locale_codeset) {
            Some(codeset) => Self::from_label(codeset),
            None => Self::ASCII,
        }
    }

    const fn pack(self) -> u8 {
        self.byte_encoding.to_bits()
            | (self.target.to_bits() << 2)
            | ((self.dec_special as u8) << 4)
    }

    const fn unpack(bits: u8) -> Self {
        Self {
            byte_encoding: ByteEncoding::from_bits(bits),
            target: TargetEncoding::from_bits(bits >> 2),
            dec_special: bits & 0b1_0000 != 0,
        }
    }
}

/// Extract the codeset from a locale string such as `en_US.UTF-8@euro`.
fn locale_codeset(locale: &str) -> Option<&str> {
    let (_, rest) = locale.split_once('.')?;
    let codeset = rest.split('@').next().unwrap_or(rest);
    (!codeset.is_empty()).then_some(codeset)
}

// ============================================================================
// Process-Wide Value
// ============================================================================

static GLOBAL_ENCODING: AtomicU8 = AtomicU8::new(EncodingConfig::UTF8.pack());

/// Replace the process-wide encoding.
pub fn set_encoding(config: EncodingConfig) {
    GLOBAL_ENCODING.store(config.pack(), Ordering::Release);
    crate::debug!(
        encoding = config.byte_encoding.as_str(),
        dec_special = config.dec_special,
        "encoding switched"
    );
}

/// Replace the process-wide encoding from a charset label.
pub fn set_encoding_label(label: &str) {
    set_encoding(EncodingConfig::from_label(label));
}

/// Initialize the process-wide encoding from the environment and return it.
pub fn init_from_env() -> EncodingConfig {
    let config = EncodingConfig::detect();
    set_encoding(config);
    config
}

/// Restore the process-wide encoding to UTF-8.
pub fn reset_encoding() {
    set_encoding(EncodingConfig::UTF8);
}

/// The process-wide encoding, ignoring thread-local overrides.
#[must_use]
pub fn global_encoding() -> EncodingConfig {
    EncodingConfig::unpack(GLOBAL_ENCODING.load(Ordering::Acquire))
}

// ============================================================================
// Thread-Local Override Stack
// ============================================================================

thread_local! {
    /// Stack of active encoding overrides for this thread.
    static OVERRIDE_STACK: RefCell<Vec<EncodingConfig>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard that pops an encoding override when dropped.
#[must_use]
pub struct EncodingGuard {
    /// Marker to prevent Send/Sync (thread-local data)
    _marker: std::marker::PhantomData<*const ()>,
}

impl Drop for EncodingGuard {
    fn drop(&mut self) {
        OVERRIDE_STACK.with(|stack| {
            if stack.borrow_mut().pop().is_none() {
                debug_assert!(false, "EncodingGuard dropped but stack was empty");
            }
        });
    }
}

/// Push an encoding override for the current thread.
///
/// ```
/// use strata_core::encoding::{EncodingConfig, ByteEncoding, current_encoding, push_encoding};
///
/// let _guard = push_encoding(EncodingConfig::new(ByteEncoding::Wide));
/// assert_eq!(current_encoding().byte_encoding, ByteEncoding::Wide);
/// ```
pub fn push_encoding(config: EncodingConfig) -> EncodingGuard {
    OVERRIDE_STACK.with(|stack| stack.borrow_mut().push(config));
    EncodingGuard {
        _marker: std::marker::PhantomData,
    }
}

/// Run `f` with `config` as this thread's encoding.
///
/// The override is removed when `f` returns, even if it panics.
pub fn with_encoding<F, R>(config: EncodingConfig, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = push_encoding(config);
    f()
}

/// Whether any override is active on this thread.
#[must_use]
pub fn has_active_override() -> bool {
    OVERRIDE_STACK.with(|stack| !stack.borrow().is_empty())
}

/// The effective encoding: innermost override, else the process-wide value.
#[must_use]
pub fn current_encoding() -> EncodingConfig {
    OVERRIDE_STACK
        .with(|stack| stack.borrow().last().copied())
        .unwrap_or_else(global_encoding)
}
