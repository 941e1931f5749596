//! The process-wide encoding.
//!
//! Kept in its own test binary: unit tests run in parallel threads of one
//! process and must not observe a switched global value.

use strata_core::encoding::global_encoding;
use strata_core::{
    ByteEncoding, EncodingConfig, current_encoding, reset_encoding, set_encoding,
    set_encoding_label, with_encoding,
};

#[test]
fn set_override_and_reset() {
    assert_eq!(global_encoding(), EncodingConfig::UTF8);

    set_encoding_label("euc-kr");
    assert_eq!(global_encoding().byte_encoding, ByteEncoding::Wide);
    assert_eq!(current_encoding().byte_encoding, ByteEncoding::Wide);

    let seen = with_encoding(EncodingConfig::ASCII, current_encoding);
    assert_eq!(seen, EncodingConfig::ASCII);
    assert_eq!(global_encoding().byte_encoding, ByteEncoding::Wide);

    let other = std::thread::spawn(current_encoding).join().expect("thread");
    assert_eq!(other.byte_encoding, ByteEncoding::Wide);

    set_encoding(EncodingConfig::ASCII);
    assert_eq!(current_encoding(), EncodingConfig::ASCII);

    reset_encoding();
    assert_eq!(global_encoding(), EncodingConfig::UTF8);
}
