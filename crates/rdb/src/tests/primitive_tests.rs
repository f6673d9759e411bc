use crate::primitive::*;
use crate::testkit::put_length;
use crate::{RdbError, Result};
use proptest::prelude::*;

// -------------------- Length encoding --------------------

#[test]
fn six_bit_length() -> Result<()> {
    let mut rd: &[u8] = &[0x05];
    assert_eq!(read_length(&mut rd)?, 5);
    assert!(rd.is_empty());
    Ok(())
}

#[test]
fn fourteen_bit_length_uses_next_byte() -> Result<()> {
    let mut rd: &[u8] = &[0x41, 0x00];
    assert_eq!(read_length(&mut rd)?, 256);
    Ok(())
}

#[test]
fn thirty_two_bit_length_is_big_endian() -> Result<()> {
    let mut rd: &[u8] = &[0x80, 0x00, 0x00, 0x01, 0x00];
    assert_eq!(read_length(&mut rd)?, 256);
    Ok(())
}

#[test]
fn sixty_four_bit_length() -> Result<()> {
    let mut rd: &[u8] = &[0x81, 0, 0, 0, 1, 0, 0, 0, 0];
    assert_eq!(read_length(&mut rd)?, 1 << 32);
    Ok(())
}

#[test]
fn illegal_length_selector_is_rejected() {
    let mut rd: &[u8] = &[0x82, 0, 0, 0, 0];
    match read_length(&mut rd) {
        Err(RdbError::InvalidLength(0x82)) => {}
        other => panic!("expected InvalidLength, got {:?}", other),
    }
}

#[test]
fn special_encoding_is_only_reported_by_encoded_reader() -> Result<()> {
    let mut rd: &[u8] = &[0xC3];
    assert_eq!(read_encoded_length(&mut rd)?, Length::Special(3));

    let mut rd: &[u8] = &[0xC3];
    let err = read_length(&mut rd).unwrap_err();
    assert!(matches!(err, RdbError::UnexpectedSpecial(3)));
    assert!(err.is_framing());
    Ok(())
}

#[test]
fn missing_length_byte_is_eof() {
    let mut rd: &[u8] = &[0x41];
    let err = read_length(&mut rd).unwrap_err();
    assert!(err.is_framing(), "short read should be a framing error: {}", err);
}

proptest! {
    #[test]
    fn shortest_form_lengths_decode(len in any::<u64>()) {
        let mut buf = Vec::new();
        put_length(&mut buf, len);
        let mut rd = buf.as_slice();
        prop_assert_eq!(read_length(&mut rd).unwrap(), len);
        prop_assert!(rd.is_empty());
    }
}

// -------------------- Raw bytes --------------------

#[test]
fn read_bytes_exact() -> Result<()> {
    let mut rd: &[u8] = b"hello world";
    assert_eq!(read_bytes(&mut rd, 5)?, b"hello");
    assert_eq!(rd, b" world");
    Ok(())
}

#[test]
fn read_bytes_short_input_fails() {
    let mut rd: &[u8] = b"abc";
    match read_bytes(&mut rd, 10) {
        Err(RdbError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("expected eof, got {:?}", other),
    }
}

#[test]
fn read_bytes_refuses_absurd_lengths() {
    let mut rd: &[u8] = b"abc";
    assert!(matches!(
        read_bytes(&mut rd, u64::MAX),
        Err(RdbError::Corrupt(_))
    ));
}

#[test]
fn skip_bytes_advances() -> Result<()> {
    let mut rd: &[u8] = b"0123456789";
    skip_bytes(&mut rd, 4)?;
    assert_eq!(rd, b"456789");
    assert!(skip_bytes(&mut rd, 7).is_err());
    Ok(())
}
