/**
 * Integrity and accuracy tables.
 *
 * The Navigation Integrity Category (NIC) and the horizontal containment
 * radius Rc of a position message follow from its type code, the ADS-B
 * version of the transmitter, and up to three NIC supplement bits:
 *
 * | bit   | carried by                                  |
 * | ----- | ------------------------------------------- |
 * | NIC_A | operational status messages (latched)       |
 * | NIC_B | the position message itself (version 2)     |
 * | NIC_C | surface operational status messages (latched) |
 *
 * ADS-B version 0 messages carry no accuracy block at all; NACp and SIL
 * defaults are implied by the position type code per ED-102A Tables N-7 and
 * N-8 ([`v0_nacp`], [`v0_sil`]).
 */

/// Rc when the type code / supplement combination defines none.
pub const RC_UNKNOWN: u32 = 0;

/// NIC and Rc (meters) for a position message.
///
/// One row per (type code, version, supplement) combination; versions 0, 1
/// and 2 only differ for surface type codes 7 and 8 and airborne 11, 13
/// and 16. Smaller NIC and larger Rc mean a worse containment guarantee.
pub fn nic_rc(
    metype: u8,
    version: i8,
    nic_a: bool,
    nic_b: bool,
    nic_c: bool,
) -> (u32, u32) {
    match (metype, version) {
        (5 | 9 | 20, _) => (11, 8),
        (6 | 10 | 21, _) => (10, 25),

        (7, 2) => {
            if nic_a && !nic_c {
                (9, 75)
            } else {
                (8, 186)
            }
        }
        (7, 1) => {
            if nic_a {
                (9, 75)
            } else {
                (8, 186)
            }
        }
        (7, _) => (8, 186),

        (8, 2) => match (nic_a, nic_c) {
            (true, true) => (7, 371),
            (true, false) => (6, 556),
            (false, true) => (6, 926),
            (false, false) => (0, RC_UNKNOWN),
        },
        (8, _) => (0, RC_UNKNOWN),

        (11, 2) => {
            if nic_a && nic_b {
                (9, 75)
            } else {
                (8, 186)
            }
        }
        (11, 1) => {
            if nic_a {
                (9, 75)
            } else {
                (8, 186)
            }
        }
        (11, _) => (8, 186),

        (12, _) => (7, 371),

        (13, 2) => match (nic_a, nic_b) {
            (false, true) => (6, 556),
            (false, false) => (6, 926),
            (true, true) => (6, 1112),
            // bad combination, assume the worst containment
            (true, false) => (6, RC_UNKNOWN),
        },
        (13, 1) => {
            if nic_a {
                (6, 1112)
            } else {
                (6, 926)
            }
        }
        (13, _) => (6, 926),

        (14, _) => (5, 1852),
        (15, _) => (4, 3704),

        (16, 2) | (16, 1) => {
            let nic = if nic_a && nic_b { 3 } else { 2 };
            let supplement = if version == 2 { nic_a && nic_b } else { nic_a };
            (nic, if supplement { 7408 } else { 14_816 })
        }
        (16, _) => (if nic_a && nic_b { 3 } else { 2 }, 18_520),

        (17, _) => (1, 37_040),

        _ => (0, RC_UNKNOWN),
    }
}

/// NACp implied by a v0 position message type, per ED-102A Table N-7.
pub fn v0_nacp(msgtype: u8, metype: u8) -> Option<u8> {
    if msgtype != 17 && msgtype != 18 {
        return None;
    }
    match metype {
        0 => Some(0),
        5 => Some(11),
        6 => Some(10),
        7 => Some(8),
        8 => Some(0),
        9 => Some(11),
        10 => Some(10),
        11 => Some(8),
        12 => Some(7),
        13 => Some(6),
        14 => Some(5),
        15 => Some(4),
        16 => Some(1),
        17 => Some(1),
        18 => Some(0),
        20 => Some(11),
        21 => Some(10),
        22 => Some(0),
        _ => None,
    }
}

/// SIL implied by a v0 position message type, per ED-102A Table N-8.
pub fn v0_sil(msgtype: u8, metype: u8) -> Option<u8> {
    if msgtype != 17 && msgtype != 18 {
        return None;
    }
    match metype {
        0 | 18 | 22 => Some(0),
        5..=17 | 20 | 21 => Some(2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finest_and_coarsest_type_codes() {
        assert_eq!(nic_rc(9, 2, false, false, false), (11, 8));
        assert_eq!(nic_rc(5, 0, true, true, true), (11, 8));
        assert_eq!(nic_rc(17, 2, false, false, false), (1, 37_040));
        assert_eq!(nic_rc(18, 2, false, false, false), (0, RC_UNKNOWN));
    }

    #[test]
    fn supplement_bits_refine_airborne_codes() {
        // type 11 only reaches NIC 9 with both supplements on version 2
        assert_eq!(nic_rc(11, 2, true, true, false), (9, 75));
        assert_eq!(nic_rc(11, 2, true, false, false), (8, 186));
        assert_eq!(nic_rc(11, 1, true, false, false), (9, 75));
        assert_eq!(nic_rc(11, 0, true, true, true), (8, 186));

        assert_eq!(nic_rc(16, 2, true, true, false), (3, 7408));
        assert_eq!(nic_rc(16, 1, true, false, false), (2, 7408));
        assert_eq!(nic_rc(16, 0, false, false, false), (2, 18_520));
    }

    #[test]
    fn surface_type_8_needs_version_2() {
        assert_eq!(nic_rc(8, 2, true, false, true), (7, 371));
        assert_eq!(nic_rc(8, 2, false, false, true), (6, 926));
        assert_eq!(nic_rc(8, 1, true, true, true), (0, RC_UNKNOWN));
    }

    #[test]
    fn v0_defaults_follow_the_type_code() {
        assert_eq!(v0_nacp(17, 9), Some(11));
        assert_eq!(v0_nacp(17, 13), Some(6));
        assert_eq!(v0_nacp(17, 19), None);
        assert_eq!(v0_nacp(11, 9), None);

        assert_eq!(v0_sil(17, 9), Some(2));
        assert_eq!(v0_sil(18, 18), Some(0));
        assert_eq!(v0_sil(17, 4), None);
    }
}
