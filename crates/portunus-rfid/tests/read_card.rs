//! Card identification against the simulated chip.

use portunus_core::{Error, Uid};
use portunus_hardware::mock::NoDelay;
use portunus_rfid::registers::{bcc, picc};
use portunus_rfid::{Mfrc522, SimFaults, SimHandle, SimulatedMfrc522};
use proptest::prelude::*;
use rstest::rstest;

fn reader() -> (Mfrc522<SimulatedMfrc522, NoDelay>, SimHandle) {
    let (chip, sim) = SimulatedMfrc522::new();
    let mut reader = Mfrc522::new(chip, NoDelay::new());
    reader.initialize().expect("simulated chip comes up");
    (reader, sim)
}

#[test]
fn test_empty_field_is_no_card() {
    let (mut reader, _sim) = reader();
    assert_eq!(reader.read_card().unwrap_err(), Error::NoCard);
}

#[rstest]
#[case::single(&[0x04, 0xA3, 0x2B, 0x11])]
#[case::double(&[0x04, 0x52, 0x9C, 0x1A, 0x7F, 0x33, 0x80])]
#[case::triple(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A])]
fn test_reads_every_uid_size(#[case] bytes: &[u8]) {
    let (mut reader, sim) = reader();
    let uid = Uid::new(bytes).unwrap();
    sim.present_card(uid);

    let read = reader.read_card().unwrap();
    assert_eq!(read, uid);
    assert_eq!(read.as_bytes(), bytes);
}

#[test]
fn test_seven_byte_cascade_sequence() {
    let (mut reader, sim) = reader();
    sim.present_card(Uid::new(b"abcdefg").unwrap());

    let uid = reader.read_card().unwrap();
    assert_eq!(uid.as_bytes(), b"abcdefg");

    let frames = sim.frames();
    let selects: Vec<u8> = frames
        .iter()
        .filter(|f| f.len() == 9 && f[1] == picc::NVB_SELECT)
        .map(|f| f[0])
        .collect();
    assert_eq!(selects, vec![picc::SEL_CL1, picc::SEL_CL2]);

    let cl1_select = frames
        .iter()
        .find(|f| f.len() == 9 && f[0] == picc::SEL_CL1)
        .unwrap();
    assert_eq!(&cl1_select[2..6], &[0x88, b'a', b'b', b'c']);
}

#[test]
fn test_collision_wins_over_timer() {
    let (mut reader, sim) = reader();
    sim.present_card("04:A3:2B:11".parse().unwrap());
    sim.inject(SimFaults {
        collision: true,
        ..SimFaults::default()
    });

    assert_eq!(reader.read_card().unwrap_err(), Error::Collision);
}

#[test]
fn test_parity_error_is_read_failure() {
    let (mut reader, sim) = reader();
    sim.present_card("04:A3:2B:11".parse().unwrap());
    sim.inject(SimFaults {
        parity_error: true,
        ..SimFaults::default()
    });

    assert!(matches!(reader.read_card(), Err(Error::ReadFailure(_))));
}

#[test]
fn test_truncated_atqa_is_read_failure() {
    let (mut reader, sim) = reader();
    sim.present_card("04:A3:2B:11".parse().unwrap());
    sim.inject(SimFaults {
        truncated_atqa: true,
        ..SimFaults::default()
    });

    assert!(matches!(reader.read_card(), Err(Error::ReadFailure(_))));
}

#[test]
fn test_crc_stall_is_timeout() {
    let (mut reader, sim) = reader();
    sim.present_card("04:A3:2B:11".parse().unwrap());
    sim.inject(SimFaults {
        crc_stall: true,
        ..SimFaults::default()
    });

    assert!(matches!(reader.read_card(), Err(Error::Timeout(_))));
}

#[test]
fn test_silent_chip_is_timeout() {
    let (mut reader, sim) = reader();
    sim.inject(SimFaults {
        irq_stall: true,
        ..SimFaults::default()
    });

    assert!(matches!(reader.read_card(), Err(Error::Timeout(_))));
}

#[rstest]
#[case::single("04:A3:2B:11")]
#[case::double("04:52:9C:1A:7F:33:80")]
fn test_sak_disagreeing_with_cascade_tag_is_rejected(#[case] text: &str) {
    let (mut reader, sim) = reader();
    sim.present_card(text.parse().unwrap());
    sim.inject(SimFaults {
        wrong_sak: true,
        ..SimFaults::default()
    });

    assert!(matches!(reader.read_card(), Err(Error::ReadFailure(_))));
}

#[test]
fn test_recovers_after_fault_cleared() {
    let (mut reader, sim) = reader();
    let uid: Uid = "04:A3:2B:11".parse().unwrap();
    sim.present_card(uid);
    sim.inject(SimFaults {
        corrupt_bcc: true,
        ..SimFaults::default()
    });
    assert!(reader.read_card().is_err());

    sim.clear_faults();
    assert_eq!(reader.read_card().unwrap(), uid);
}

proptest! {
    #[test]
    fn prop_bcc_mismatch_never_yields_uid(bytes in proptest::array::uniform4(any::<u8>())) {
        prop_assume!(bytes[0] != picc::CASCADE_TAG);
        let (mut reader, sim) = reader();
        sim.present_card(Uid::new(&bytes).unwrap());
        sim.inject(SimFaults { corrupt_bcc: true, ..SimFaults::default() });

        prop_assert!(matches!(reader.read_card(), Err(Error::ReadFailure(_))));
    }

    #[test]
    fn prop_clean_single_size_reads_roundtrip(bytes in proptest::array::uniform4(any::<u8>())) {
        prop_assume!(bytes[0] != picc::CASCADE_TAG);
        let (mut reader, sim) = reader();
        let uid = Uid::new(&bytes).unwrap();
        sim.present_card(uid);

        prop_assert_eq!(reader.read_card().unwrap(), uid);
        prop_assert_eq!(bcc(&bytes), bytes.iter().fold(0, |a, b| a ^ b));
    }
}

#[test]
fn test_missing_chip_is_device_not_found() {
    let (chip, sim) = SimulatedMfrc522::new();
    sim.set_version(0xFF);
    let mut reader = Mfrc522::new(chip, NoDelay::new());

    assert_eq!(
        reader.initialize().unwrap_err(),
        Error::DeviceNotFound { version: 0xFF }
    );
}
