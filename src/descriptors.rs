use device_descriptor::*;

device! {
    /// Charge state and fault flags. UVF and PORF are host-clearable, the
    /// remaining flags are maintained by the gauge itself.
    Status(u8 @ 0x01, default = 0x00) {
        /// Charge Termination Flag: set when the charge termination
        /// conditions (VOLT above VCHG while IAVG falls below IMIN) have
        /// been met.
        chgtf @ 0..1 => bool,

        /// Active Empty Flag: set when the cell crossed the active empty
        /// point (VOLT below VAE while discharging above IAE).
        aef @ 1..2 => bool,

        /// Standby Empty Flag: set when the standby empty point is reached.
        sef @ 2..3 => bool,

        /// Learn Flag: set while a capacity learn cycle is in progress.
        learnf @ 3..4 => bool,

        /// Under-Voltage Flag: set when VOLT drops below the under-voltage
        /// sleep threshold. Write 0 to clear.
        uvf @ 5..6 => bool,

        /// Power-On Reset Flag: set after every reset of the gauge. Write 0
        /// to acknowledge.
        porf @ 6..7 => bool,
    }

    /// Remaining Active Absolute Capacity in 1.6 mAh units.
    Raac(u16 @ 0x02) {
        capacity @ 0..16 => u16,
    }

    /// Remaining Standby Absolute Capacity in 1.6 mAh units.
    Rsac(u16 @ 0x04) {
        capacity @ 0..16 => u16,
    }

    /// Remaining Active Relative Capacity in percent of the learned full
    /// capacity.
    Rarc(u8 @ 0x06) {
        percentage @ 0..8 => u8,
    }

    /// Remaining Standby Relative Capacity in percent.
    Rsrc(u8 @ 0x07) {
        percentage @ 0..8 => u8,
    }

    /// Average current over the last 28 seconds, two's complement, in
    /// sense-voltage units (see the CURRENT scaling).
    Iavg(u16 @ 0x08) {
        current @ 0..16 => u16,
    }

    /// Die temperature, two's complement, 5 reserved low bits.
    Temp(u16 @ 0x0A) {
        temperature @ 0..16 => u16,
    }

    /// Cell voltage, two's complement, 5 reserved low bits. The raw reading
    /// is discharge-referenced; the facade flips the sign.
    Volt(u16 @ 0x0C) {
        voltage @ 0..16 => u16,
    }

    /// Instantaneous current, two's complement. The gauge digitizes the
    /// voltage drop across the external sense resistor, so the reading is a
    /// sense voltage until divided by the resistance.
    Current(u16 @ 0x0E) {
        current @ 0..16 => u16,
    }

    /// Accumulated Current Register, the coulomb counter. Auto-saved to
    /// EEPROM; host-writable to re-seat the gauge to a known charge state.
    Acr(u16 @ 0x10, default = 0x0000) {
        charge @ 0..16 => u16,
    }

    /// Fractional bits of the coulomb counter below the ACR resolution.
    Acrl(u16 @ 0x12) {
        charge @ 0..16 => u16,
    }

    /// Age Scalar: learned cell capacity as a fraction of the rated
    /// capacity, 0.78% per LSB. Auto-saved.
    As(u8 @ 0x14, default = 0x00) {
        scalar @ 0..8 => u8,
    }

    /// Special Feature Register.
    Sfr(u8 @ 0x15, default = 0x00) {
        /// Slave Address Write Enable: permits rewriting the 2-wire address
        /// parameter.
        sawe @ 6..7 => bool,

        /// PIO pin sense and control.
        piosc @ 7..8 => bool,
    }

    /// Learned full capacity at the present temperature, raw device units.
    Full(u16 @ 0x16) {
        capacity @ 0..16 => u16,
    }

    /// Active empty point at the present temperature, raw device units.
    Ae(u16 @ 0x18) {
        capacity @ 0..16 => u16,
    }

    /// Standby empty point at the present temperature, raw device units.
    Se(u16 @ 0x1A) {
        capacity @ 0..16 => u16,
    }

    /// EEPROM control and lock status.
    Eeprom(u8 @ 0x1F, default = 0x00) {
        /// EEPROM Copy in progress.
        eec @ 0..1 => bool,

        /// Lock Enable: arms the lock function commands.
        lock @ 1..2 => bool,

        /// Block 1 (parameter EEPROM) lock flag. Locked blocks are
        /// permanently read-only.
        bl1 @ 6..7 => bool,

        /// Block 0 (user EEPROM) lock flag.
        bl0 @ 7..8 => bool,
    }

    /// Function Command register. Write-only; reads are chip-defined.
    Command(u8 @ 0xFE, default = 0x00) {
        opcode @ 0..8 => u8,
    }
}

/// User EEPROM, lockable, block 0.
pub const USER_EEPROM_1: u8 = 0x20;
pub const USER_EEPROM_1_LEN: usize = 16;

/// Additional user EEPROM, lockable, block 0.
pub const USER_EEPROM_2: u8 = 0x30;
pub const USER_EEPROM_2_LEN: usize = 8;

/// Parameter EEPROM, lockable, block 1. The registers in [`params`] are a
/// named view over this range.
pub const PARAMETER_EEPROM: u8 = 0x60;
pub const PARAMETER_EEPROM_LEN: usize = 32;

/// Factory-programmed unique ID (factory option).
pub const UNIQUE_ID: u8 = 0xF0;
pub const UNIQUE_ID_LEN: usize = 8;

/// Opcodes accepted by the Function Command register. Commands are
/// fire-and-forget; the gauge reports no completion status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FunctionCommand {
    CopyBlock0 = 0x42,
    CopyBlock1 = 0x44,
    RecallBlock0 = 0xB2,
    RecallBlock1 = 0xB4,
    LockBlock0 = 0x63,
    LockBlock1 = 0x66,
}

/// EEPROM-backed configuration parameters, recalled into shadow RAM at
/// power-up and committed with the copy function commands.
pub mod params {
    use device_descriptor::*;

    device! {
        /// Operating mode configuration.
        Control(u8 @ 0x60, default = 0x00) {
            /// Under-Voltage Sleep Enable.
            uven @ 1..2 => bool,

            /// Power Mode Enable (sleep between conversions).
            pmod @ 2..3 => bool,
        }

        /// Accumulation Bias: two's complement offset added to the coulomb
        /// counter every accumulation interval.
        Ab(u8 @ 0x61, default = 0x00) {
            bias @ 0..8 => u8,
        }

        /// Aging Capacity: rated cell capacity used for age estimation.
        Ac(u16 @ 0x62, default = 0x0000) {
            capacity @ 0..16 => u16,
        }

        /// Charge Voltage threshold for charge-termination detection.
        Vchg(u8 @ 0x64, default = 0x00) {
            voltage @ 0..8 => u8,
        }

        /// Minimum Charge Current threshold for charge-termination
        /// detection.
        Imin(u8 @ 0x65, default = 0x00) {
            current @ 0..8 => u8,
        }

        /// Active Empty Voltage threshold.
        Vae(u8 @ 0x66, default = 0x00) {
            voltage @ 0..8 => u8,
        }

        /// Active Empty Current threshold.
        Iae(u8 @ 0x67, default = 0x00) {
            current @ 0..8 => u8,
        }

        /// Cell capacity at the active empty point at 40°C.
        ActiveEmpty40(u8 @ 0x68, default = 0x00) {
            capacity @ 0..8 => u8,
        }

        /// Sense Resistor Prime: nominal conductance of the external sense
        /// resistor in mho.
        Rsnsp(u8 @ 0x69, default = 0x00) {
            conductance @ 0..8 => u8,
        }

        /// Rated full capacity at 40°C.
        Full40(u16 @ 0x6A, default = 0x0000) {
            capacity @ 0..16 => u16,
        }

        /// Sense Resistor Gain: board-level calibration of the sense
        /// resistance.
        Rsgain(u16 @ 0x78, default = 0x0000) {
            gain @ 0..16 => u16,
        }

        /// Sense Resistor Temperature Coefficient.
        Rstc(u8 @ 0x7A, default = 0x00) {
            coefficient @ 0..8 => u8,
        }

        /// Factory Sense Resistor Gain, programmed at final test. Read-only
        /// reference copy of RSGAIN.
        Frsgain(u16 @ 0x7B) {
            gain @ 0..16 => u16,
        }

        /// 2-wire slave address, rewritable when SFR.SAWE is set.
        SlaveAddress(u8 @ 0x7E, default = 0x68) {
            address @ 0..8 => u8,
        }
    }

    /// Capacity-vs-temperature slope tables, 4 bytes each, reachable through
    /// the sequential access path.
    pub const FULL_SLOPE: u8 = 0x6C;
    pub const ACTIVE_EMPTY_SLOPE: u8 = 0x70;
    pub const STANDBY_EMPTY_SLOPE: u8 = 0x74;
    pub const SLOPE_LEN: usize = 4;
}

// The parameter view deliberately aliases the Parameter EEPROM block; there
// is no separate address space behind it.
const _: () = {
    assert!(params::Control::ADDRESS == PARAMETER_EEPROM);
    assert!(params::Frsgain::ADDRESS + 1 < PARAMETER_EEPROM + PARAMETER_EEPROM_LEN as u8);
    assert!(params::SlaveAddress::ADDRESS < PARAMETER_EEPROM + PARAMETER_EEPROM_LEN as u8);
    assert!(params::STANDBY_EMPTY_SLOPE + (params::SLOPE_LEN as u8)
        <= PARAMETER_EEPROM + PARAMETER_EEPROM_LEN as u8);
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn addresses_match_the_vendor_map() {
        assert_eq!(Status::ADDRESS, 0x01);
        assert_eq!(Raac::ADDRESS, 0x02);
        assert_eq!(Iavg::ADDRESS, 0x08);
        assert_eq!(Temp::ADDRESS, 0x0A);
        assert_eq!(Volt::ADDRESS, 0x0C);
        assert_eq!(Current::ADDRESS, 0x0E);
        assert_eq!(Acr::ADDRESS, 0x10);
        assert_eq!(Eeprom::ADDRESS, 0x1F);
        assert_eq!(Command::ADDRESS, 0xFE);

        assert_eq!(params::Vchg::ADDRESS, 0x64);
        assert_eq!(params::Rsgain::ADDRESS, 0x78);
        assert_eq!(params::Frsgain::ADDRESS, 0x7B);
    }

    #[test]
    fn status_flags_decode_from_their_documented_positions() {
        let status = Status::from_bits(0b0000_0001);
        assert!(status.chgtf().read());
        assert!(!status.aef().read());
        assert!(!status.sef().read());
        assert!(!status.learnf().read());
        assert!(!status.uvf().read());
        assert!(!status.porf().read());

        let status = Status::from_bits(0b0010_0000);
        assert!(status.uvf().read());
        assert!(!status.chgtf().read());
        assert!(!status.porf().read());

        let status = Status::from_bits(0b0100_0000);
        assert!(status.porf().read());
        assert!(!status.uvf().read());
    }

    #[test]
    fn eeprom_lock_flags_decode() {
        let eeprom = Eeprom::from_bits(0b1100_0010);
        assert!(eeprom.lock().read());
        assert!(eeprom.bl0().read());
        assert!(eeprom.bl1().read());
        assert!(!eeprom.eec().read());
    }
}
