#![no_std]

//! Platform-agnostic driver for the Maxim DS2782 stand-alone fuel gauge.
//!
//! The gauge measures cell voltage, die temperature and the voltage drop
//! across an external sense resistor, and integrates that drop into a
//! coulomb counter. This crate exposes its register map over any
//! `embedded-hal` 1.0 I²C bus, blocking or async, and converts the
//! fixed-point readings into volts, milliamps, °C and milliamp-hours.

use byteorder::{BigEndian, ByteOrder};
use device_descriptor::Register;
use embedded_hal::i2c::I2c;
use embedded_hal_async::i2c::I2c as AsyncI2c;
use register_access::{
    AsyncSequentialAccess, RegisterReader, RegisterWriter, SequentialAccess,
};

pub mod descriptors;
pub mod ll;

use crate::{
    descriptors::{params, *},
    ll::Ds2782Interface,
};

pub use crate::{descriptors::FunctionCommand, ll::DEFAULT_ADDRESS};

/// VOLT register LSB in volts: 5.0 V full scale over a 16-bit reading with
/// 1 sign bit, 10 value bits and 5 reserved low bits.
pub const VOLTAGE_V_PER_LSB: f32 = 5.0 / (((1 << 10) << 5) as f32);

/// TEMP register LSB in °C: 1 sign bit, 7 integer bits, 3 fractional bits,
/// 5 reserved low bits.
pub const TEMPERATURE_C_PER_LSB: f32 = 1.0 / (((1 << 3) << 5) as f32);

/// CURRENT and IAVG register LSB in mV across the sense resistor: 1 sign
/// bit, 9 integer bits, 6 fractional bits of a 0.1 mV unit.
pub const SENSE_VOLTAGE_MV_PER_LSB: f32 = 0.1 / ((1 << 6) as f32);

/// ACR register LSB in mVh: 12 integer bits, 4 fractional bits of a 0.1 mVh
/// unit.
pub const ACCUMULATED_CHARGE_MVH_PER_LSB: f32 = 0.1 / ((1 << 4) as f32);

/// ACRL register LSB in mVh: 6 integer bits, 6 fractional bits, 4 reserved
/// low bits.
pub const LOW_ACCUMULATED_CHARGE_MVH_PER_LSB: f32 = 0.1 / (((1 << 6) << 4) as f32);

/// AB parameter LSB in mVh: 1 sign bit, 1 integer bit, 6 fractional bits.
pub const ACCUMULATION_BIAS_MVH_PER_LSB: f32 = 0.1 / ((1 << 6) as f32);

/// RAAC/RSAC register LSB in mAh. The datasheet states 1.6 mAh; suspiciously
/// close to 1.5625 (a 0.1/64 unit), but its table is explicit.
pub const ABSOLUTE_CAPACITY_MAH_PER_LSB: f32 = 1.6;

/// Converts a raw VOLT reading to volts. Linear and odd; the raw register
/// convention is discharge-referenced, which [`Ds2782::read_voltage`]
/// compensates for by flipping the sign.
///
/// ```rust
/// assert_eq!(ds2782::raw_voltage_to_volts(16384), 2.5);
/// assert_eq!(ds2782::raw_voltage_to_volts(-16384), -2.5);
/// ```
#[inline]
pub fn raw_voltage_to_volts(raw: i16) -> f32 {
    f32::from(raw) * VOLTAGE_V_PER_LSB
}

/// Converts a raw TEMP reading to °C.
///
/// ```rust
/// assert_eq!(ds2782::raw_temperature_to_celsius(6400), 25.0);
/// assert_eq!(ds2782::raw_temperature_to_celsius(-6400), -25.0);
/// ```
#[inline]
pub fn raw_temperature_to_celsius(raw: i16) -> f32 {
    f32::from(raw) * TEMPERATURE_C_PER_LSB
}

/// Converts a raw CURRENT or IAVG reading to the measured sense-resistor
/// voltage drop in mV.
#[inline]
pub fn raw_sense_voltage_to_mv(raw: i16) -> f32 {
    f32::from(raw) * SENSE_VOLTAGE_MV_PER_LSB
}

/// Converts a raw RAAC/RSAC reading to mAh. Capacity is integrated by the
/// gauge itself, so unlike the current family this does not depend on the
/// sense resistance.
///
/// ```rust
/// assert_eq!(ds2782::raw_capacity_to_mah(100), 160.0);
/// ```
#[inline]
pub fn raw_capacity_to_mah(raw: u16) -> f32 {
    f32::from(raw) * ABSOLUTE_CAPACITY_MAH_PER_LSB
}

/// The external sense resistor the gauge measures current across.
///
/// The chip digitizes the voltage drop across this resistor, so every
/// current-derived reading is scaled by its resistance. The value is a board
/// parameter, fixed for the lifetime of the driver; it must be positive.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SenseResistor {
    ohms: f32,
    mhos: f32,
}

impl SenseResistor {
    pub fn new(ohms: f32) -> Self {
        debug_assert!(ohms > 0.0);

        Self {
            ohms,
            mhos: 1.0 / ohms,
        }
    }

    pub fn ohms(self) -> f32 {
        self.ohms
    }

    /// Conductance of the resistor in mho, cached at construction.
    pub fn mhos(self) -> f32 {
        self.mhos
    }

    /// Converts a raw CURRENT or IAVG reading to mA.
    ///
    /// ```rust
    /// # use ds2782::SenseResistor;
    /// let rsns = SenseResistor::new(0.02);
    /// assert!((rsns.raw_current_to_ma(100) - 7.8125).abs() < 1e-4);
    /// ```
    #[inline]
    pub fn raw_current_to_ma(self, raw: i16) -> f32 {
        raw_sense_voltage_to_mv(raw) / self.ohms
    }

    /// Converts a raw ACR reading to mAh.
    #[inline]
    pub fn raw_accumulated_charge_to_mah(self, raw: u16) -> f32 {
        f32::from(raw) * ACCUMULATED_CHARGE_MVH_PER_LSB / self.ohms
    }

    /// Converts an mAh value to a raw ACR value, for re-seating the coulomb
    /// counter.
    #[inline]
    pub fn mah_to_raw_accumulated_charge(self, mah: f32) -> u16 {
        (mah * self.ohms / ACCUMULATED_CHARGE_MVH_PER_LSB) as u16
    }

    /// Converts a raw ACRL reading to mAh.
    #[inline]
    pub fn raw_low_accumulated_charge_to_mah(self, raw: u16) -> f32 {
        f32::from(raw) * LOW_ACCUMULATED_CHARGE_MVH_PER_LSB / self.ohms
    }

    /// Converts a raw AB parameter to mAh.
    #[inline]
    pub fn raw_accumulation_bias_to_mah(self, raw: i8) -> f32 {
        f32::from(raw) * ACCUMULATION_BIAS_MVH_PER_LSB / self.ohms
    }
}

/// DS2782 driver over an I²C bus implementation.
///
/// All configuration is immutable after construction. The driver assumes it
/// is the only user of the gauge; callers that share it across tasks must
/// serialize access externally.
pub struct Ds2782<I> {
    iface: Ds2782Interface<I>,
    rsns: SenseResistor,
}

impl<I> Ds2782<I> {
    /// Creates a driver for the gauge at `address` (7-bit,
    /// [`DEFAULT_ADDRESS`] unless the board rewrote the address parameter).
    pub const fn new(i2c: I, address: u8, rsns: SenseResistor) -> Self {
        Self {
            iface: Ds2782Interface::new(i2c, address),
            rsns,
        }
    }

    pub fn sense_resistor(&self) -> SenseResistor {
        self.rsns
    }

    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.iface.i2c
    }

    pub fn into_inner(self) -> I {
        self.iface.i2c
    }
}

/// Maps an EEPROM block index to the matching function command. Blocks other
/// than 0 and 1 do not exist; requests for them are dropped without a bus
/// transaction.
fn block_command(
    block: u8,
    block0: FunctionCommand,
    block1: FunctionCommand,
) -> Option<FunctionCommand> {
    match block {
        0 => Some(block0),
        1 => Some(block1),
        _ => {
            logger::warn!("Ignoring function command for nonexistent EEPROM block {}", block);
            None
        }
    }
}

// Blocking interface

impl<I> Ds2782<I>
where
    I: I2c,
{
    /// Reads the status flag register.
    pub fn read_status(&mut self) -> Result<Status, I::Error> {
        Status::read(&mut self.iface)
    }

    /// Read-modify-writes the status register, e.g. to acknowledge PORF or
    /// UVF. Reserved bits are carried through unchanged.
    pub fn modify_status(&mut self, f: impl FnOnce(Status) -> Status) -> Result<(), I::Error> {
        let status = Status::read(&mut self.iface)?;
        status.modify(f).write(&mut self.iface)
    }

    /// Reads the die temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f32, I::Error> {
        let raw = Temp::read(&mut self.iface)?.temperature().read() as i16;
        Ok(raw_temperature_to_celsius(raw))
    }

    /// Reads the cell voltage in V. Positive means a cell is driving the
    /// VIN pin; the raw register reports the opposite polarity.
    pub fn read_voltage(&mut self) -> Result<f32, I::Error> {
        let raw = Volt::read(&mut self.iface)?.voltage().read() as i16;
        Ok(-raw_voltage_to_volts(raw))
    }

    /// Reads the instantaneous cell current in mA. Positive is charging.
    pub fn read_current(&mut self) -> Result<f32, I::Error> {
        let raw = Current::read(&mut self.iface)?.current().read() as i16;
        Ok(self.rsns.raw_current_to_ma(raw))
    }

    /// Reads the averaged cell current in mA.
    pub fn read_average_current(&mut self) -> Result<f32, I::Error> {
        let raw = Iavg::read(&mut self.iface)?.current().read() as i16;
        Ok(self.rsns.raw_current_to_ma(raw))
    }

    /// Reads the voltage drop across the sense resistor in mV; the unscaled
    /// view of the CURRENT register.
    pub fn read_sense_resistor_voltage(&mut self) -> Result<f32, I::Error> {
        let raw = Current::read(&mut self.iface)?.current().read() as i16;
        Ok(raw_sense_voltage_to_mv(raw))
    }

    /// Reads the remaining capacity under active load in mAh.
    pub fn read_remaining_active_absolute_capacity(&mut self) -> Result<f32, I::Error> {
        let raw = Raac::read(&mut self.iface)?.capacity().read();
        Ok(raw_capacity_to_mah(raw))
    }

    /// Reads the remaining capacity under standby load in mAh.
    pub fn read_remaining_standby_absolute_capacity(&mut self) -> Result<f32, I::Error> {
        let raw = Rsac::read(&mut self.iface)?.capacity().read();
        Ok(raw_capacity_to_mah(raw))
    }

    /// Reads the remaining active capacity in percent of the learned full
    /// capacity.
    pub fn read_remaining_active_relative_capacity(&mut self) -> Result<u8, I::Error> {
        Ok(Rarc::read(&mut self.iface)?.percentage().read())
    }

    /// Reads the remaining standby capacity in percent.
    pub fn read_remaining_standby_relative_capacity(&mut self) -> Result<u8, I::Error> {
        Ok(Rsrc::read(&mut self.iface)?.percentage().read())
    }

    /// Reads the coulomb counter in mAh.
    pub fn read_accumulated_current(&mut self) -> Result<f32, I::Error> {
        let raw = self.read_accumulated_current_raw()?;
        Ok(self.rsns.raw_accumulated_charge_to_mah(raw))
    }

    pub fn read_accumulated_current_raw(&mut self) -> Result<u16, I::Error> {
        Ok(Acr::read(&mut self.iface)?.charge().read())
    }

    /// Re-seats the coulomb counter to a known charge in mAh.
    pub fn write_accumulated_current(&mut self, mah: f32) -> Result<(), I::Error> {
        self.write_accumulated_current_raw(self.rsns.mah_to_raw_accumulated_charge(mah))
    }

    pub fn write_accumulated_current_raw(&mut self, raw: u16) -> Result<(), I::Error> {
        Acr::new(|reg| reg.charge().write(raw)).write(&mut self.iface)
    }

    /// Reads the sub-LSB remainder of the coulomb counter in mAh.
    pub fn read_low_accumulated_current(&mut self) -> Result<f32, I::Error> {
        let raw = Acrl::read(&mut self.iface)?.charge().read();
        Ok(self.rsns.raw_low_accumulated_charge_to_mah(raw))
    }

    /// Reads the accumulation bias in mAh.
    pub fn read_accumulation_bias(&mut self) -> Result<f32, I::Error> {
        let raw = self.read_accumulation_bias_raw()?;
        Ok(self.rsns.raw_accumulation_bias_to_mah(raw))
    }

    pub fn read_accumulation_bias_raw(&mut self) -> Result<i8, I::Error> {
        Ok(params::Ab::read(&mut self.iface)?.bias().read() as i8)
    }

    pub fn write_accumulation_bias_raw(&mut self, value: i8) -> Result<(), I::Error> {
        params::Ab::new(|reg| reg.bias().write(value as u8)).write(&mut self.iface)
    }

    /// Reads the age scalar, 0.78% of rated capacity per LSB.
    pub fn read_age_scalar(&mut self) -> Result<u8, I::Error> {
        Ok(As::read(&mut self.iface)?.scalar().read())
    }

    pub fn write_age_scalar(&mut self, value: u8) -> Result<(), I::Error> {
        As::new(|reg| reg.scalar().write(value)).write(&mut self.iface)
    }

    /// Reads the learned full capacity in raw device units.
    pub fn read_full_capacity_raw(&mut self) -> Result<u16, I::Error> {
        Ok(Full::read(&mut self.iface)?.capacity().read())
    }

    /// Reads the active empty point in raw device units.
    pub fn read_active_empty_raw(&mut self) -> Result<u16, I::Error> {
        Ok(Ae::read(&mut self.iface)?.capacity().read())
    }

    /// Reads the standby empty point in raw device units.
    pub fn read_standby_empty_raw(&mut self) -> Result<u16, I::Error> {
        Ok(Se::read(&mut self.iface)?.capacity().read())
    }

    pub fn read_control(&mut self) -> Result<params::Control, I::Error> {
        params::Control::read(&mut self.iface)
    }

    /// Read-modify-writes the control parameter. Reserved bits are carried
    /// through unchanged.
    pub fn modify_control(
        &mut self,
        f: impl FnOnce(params::Control) -> params::Control,
    ) -> Result<(), I::Error> {
        let control = params::Control::read(&mut self.iface)?;
        control.modify(f).write(&mut self.iface)
    }

    pub fn read_special_feature(&mut self) -> Result<Sfr, I::Error> {
        Sfr::read(&mut self.iface)
    }

    pub fn modify_special_feature(&mut self, f: impl FnOnce(Sfr) -> Sfr) -> Result<(), I::Error> {
        let sfr = Sfr::read(&mut self.iface)?;
        sfr.modify(f).write(&mut self.iface)
    }

    pub fn read_eeprom(&mut self) -> Result<Eeprom, I::Error> {
        Eeprom::read(&mut self.iface)
    }

    pub fn modify_eeprom(&mut self, f: impl FnOnce(Eeprom) -> Eeprom) -> Result<(), I::Error> {
        let eeprom = Eeprom::read(&mut self.iface)?;
        eeprom.modify(f).write(&mut self.iface)
    }

    /// Reads the charge voltage threshold, raw device units.
    pub fn read_charge_voltage(&mut self) -> Result<u8, I::Error> {
        Ok(params::Vchg::read(&mut self.iface)?.voltage().read())
    }

    pub fn write_charge_voltage(&mut self, value: u8) -> Result<(), I::Error> {
        params::Vchg::new(|reg| reg.voltage().write(value)).write(&mut self.iface)
    }

    /// Reads the minimum charge current threshold, raw device units.
    pub fn read_minimum_charge_current(&mut self) -> Result<u8, I::Error> {
        Ok(params::Imin::read(&mut self.iface)?.current().read())
    }

    pub fn write_minimum_charge_current(&mut self, value: u8) -> Result<(), I::Error> {
        params::Imin::new(|reg| reg.current().write(value)).write(&mut self.iface)
    }

    /// Reads the active empty voltage threshold, raw device units.
    pub fn read_active_empty_voltage(&mut self) -> Result<u8, I::Error> {
        Ok(params::Vae::read(&mut self.iface)?.voltage().read())
    }

    pub fn write_active_empty_voltage(&mut self, value: u8) -> Result<(), I::Error> {
        params::Vae::new(|reg| reg.voltage().write(value)).write(&mut self.iface)
    }

    /// Reads the active empty current threshold, raw device units.
    pub fn read_active_empty_current(&mut self) -> Result<u8, I::Error> {
        Ok(params::Iae::read(&mut self.iface)?.current().read())
    }

    pub fn write_active_empty_current(&mut self, value: u8) -> Result<(), I::Error> {
        params::Iae::new(|reg| reg.current().write(value)).write(&mut self.iface)
    }

    /// Reads the sense resistor prime parameter, the nominal conductance in
    /// mho.
    pub fn read_sense_resistor_prime(&mut self) -> Result<u8, I::Error> {
        Ok(params::Rsnsp::read(&mut self.iface)?.conductance().read())
    }

    pub fn write_sense_resistor_prime(&mut self, value: u8) -> Result<(), I::Error> {
        params::Rsnsp::new(|reg| reg.conductance().write(value)).write(&mut self.iface)
    }

    /// Reads the sense resistor gain calibration.
    pub fn read_sense_resistor_gain(&mut self) -> Result<u16, I::Error> {
        Ok(params::Rsgain::read(&mut self.iface)?.gain().read())
    }

    pub fn write_sense_resistor_gain(&mut self, value: u16) -> Result<(), I::Error> {
        params::Rsgain::new(|reg| reg.gain().write(value)).write(&mut self.iface)
    }

    /// Reads the factory-programmed sense resistor gain.
    pub fn read_factory_gain(&mut self) -> Result<u16, I::Error> {
        Ok(params::Frsgain::read(&mut self.iface)?.gain().read())
    }

    /// Reads the rated aging capacity, raw device units.
    pub fn read_aging_capacity_raw(&mut self) -> Result<u16, I::Error> {
        Ok(params::Ac::read(&mut self.iface)?.capacity().read())
    }

    pub fn write_aging_capacity_raw(&mut self, value: u16) -> Result<(), I::Error> {
        params::Ac::new(|reg| reg.capacity().write(value)).write(&mut self.iface)
    }

    /// Reads a big-endian word from user EEPROM at `offset` bytes past the
    /// start of the range. The offset is not range-checked.
    pub fn read_user_eeprom_word(&mut self, offset: u8) -> Result<u16, I::Error> {
        let mut data = [0; 2];
        self.iface.read_sequential(USER_EEPROM_1 + offset, &mut data)?;
        Ok(BigEndian::read_u16(&data))
    }

    pub fn write_user_eeprom_word(&mut self, offset: u8, value: u16) -> Result<(), I::Error> {
        let mut data = [0; 2];
        BigEndian::write_u16(&mut data, value);
        self.iface.write_sequential(USER_EEPROM_1 + offset, &data)
    }

    /// Reads the factory-programmed unique ID.
    pub fn read_unique_id(&mut self) -> Result<[u8; UNIQUE_ID_LEN], I::Error> {
        let mut id = [0; UNIQUE_ID_LEN];
        self.iface.read_sequential(UNIQUE_ID, &mut id)?;
        Ok(id)
    }

    /// Writes `command` to the Function Command register. Fire-and-forget;
    /// the gauge does not report completion.
    pub fn do_function_command(&mut self, command: FunctionCommand) -> Result<(), I::Error> {
        Command::new(|reg| reg.opcode().write(command as u8)).write(&mut self.iface)
    }

    /// Copies EEPROM block `block` from shadow RAM into the EEPROM cells.
    /// Block indices other than 0 and 1 are ignored without touching the
    /// bus.
    pub fn do_copy_data(&mut self, block: u8) -> Result<(), I::Error> {
        match block_command(block, FunctionCommand::CopyBlock0, FunctionCommand::CopyBlock1) {
            Some(command) => self.do_function_command(command),
            None => Ok(()),
        }
    }

    /// Recalls EEPROM block `block` into shadow RAM. Block indices other
    /// than 0 and 1 are ignored without touching the bus.
    pub fn do_recall_data(&mut self, block: u8) -> Result<(), I::Error> {
        match block_command(
            block,
            FunctionCommand::RecallBlock0,
            FunctionCommand::RecallBlock1,
        ) {
            Some(command) => self.do_function_command(command),
            None => Ok(()),
        }
    }

    /// Permanently write-protects EEPROM block `block`. Requires the LOCK
    /// bit of the EEPROM register to be set first. Block indices other than
    /// 0 and 1 are ignored without touching the bus.
    pub fn do_lock_data(&mut self, block: u8) -> Result<(), I::Error> {
        match block_command(block, FunctionCommand::LockBlock0, FunctionCommand::LockBlock1) {
            Some(command) => self.do_function_command(command),
            None => Ok(()),
        }
    }
}

// Async interface; method for method the same as the blocking one.

impl<I> Ds2782<I>
where
    I: AsyncI2c,
{
    pub async fn read_status_async(&mut self) -> Result<Status, I::Error> {
        Status::read_async(&mut self.iface).await
    }

    pub async fn modify_status_async(
        &mut self,
        f: impl FnOnce(Status) -> Status,
    ) -> Result<(), I::Error> {
        let status = Status::read_async(&mut self.iface).await?;
        status.modify(f).write_async(&mut self.iface).await
    }

    pub async fn read_temperature_async(&mut self) -> Result<f32, I::Error> {
        let raw = Temp::read_async(&mut self.iface).await?.temperature().read() as i16;
        Ok(raw_temperature_to_celsius(raw))
    }

    pub async fn read_voltage_async(&mut self) -> Result<f32, I::Error> {
        let raw = Volt::read_async(&mut self.iface).await?.voltage().read() as i16;
        Ok(-raw_voltage_to_volts(raw))
    }

    pub async fn read_current_async(&mut self) -> Result<f32, I::Error> {
        let raw = Current::read_async(&mut self.iface).await?.current().read() as i16;
        Ok(self.rsns.raw_current_to_ma(raw))
    }

    pub async fn read_average_current_async(&mut self) -> Result<f32, I::Error> {
        let raw = Iavg::read_async(&mut self.iface).await?.current().read() as i16;
        Ok(self.rsns.raw_current_to_ma(raw))
    }

    pub async fn read_sense_resistor_voltage_async(&mut self) -> Result<f32, I::Error> {
        let raw = Current::read_async(&mut self.iface).await?.current().read() as i16;
        Ok(raw_sense_voltage_to_mv(raw))
    }

    pub async fn read_remaining_active_absolute_capacity_async(
        &mut self,
    ) -> Result<f32, I::Error> {
        let raw = Raac::read_async(&mut self.iface).await?.capacity().read();
        Ok(raw_capacity_to_mah(raw))
    }

    pub async fn read_remaining_standby_absolute_capacity_async(
        &mut self,
    ) -> Result<f32, I::Error> {
        let raw = Rsac::read_async(&mut self.iface).await?.capacity().read();
        Ok(raw_capacity_to_mah(raw))
    }

    pub async fn read_remaining_active_relative_capacity_async(
        &mut self,
    ) -> Result<u8, I::Error> {
        Ok(Rarc::read_async(&mut self.iface).await?.percentage().read())
    }

    pub async fn read_remaining_standby_relative_capacity_async(
        &mut self,
    ) -> Result<u8, I::Error> {
        Ok(Rsrc::read_async(&mut self.iface).await?.percentage().read())
    }

    pub async fn read_accumulated_current_async(&mut self) -> Result<f32, I::Error> {
        let raw = self.read_accumulated_current_raw_async().await?;
        Ok(self.rsns.raw_accumulated_charge_to_mah(raw))
    }

    pub async fn read_accumulated_current_raw_async(&mut self) -> Result<u16, I::Error> {
        Ok(Acr::read_async(&mut self.iface).await?.charge().read())
    }

    pub async fn write_accumulated_current_async(&mut self, mah: f32) -> Result<(), I::Error> {
        self.write_accumulated_current_raw_async(self.rsns.mah_to_raw_accumulated_charge(mah))
            .await
    }

    pub async fn write_accumulated_current_raw_async(&mut self, raw: u16) -> Result<(), I::Error> {
        Acr::new(|reg| reg.charge().write(raw))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_low_accumulated_current_async(&mut self) -> Result<f32, I::Error> {
        let raw = Acrl::read_async(&mut self.iface).await?.charge().read();
        Ok(self.rsns.raw_low_accumulated_charge_to_mah(raw))
    }

    pub async fn read_accumulation_bias_async(&mut self) -> Result<f32, I::Error> {
        let raw = self.read_accumulation_bias_raw_async().await?;
        Ok(self.rsns.raw_accumulation_bias_to_mah(raw))
    }

    pub async fn read_accumulation_bias_raw_async(&mut self) -> Result<i8, I::Error> {
        Ok(params::Ab::read_async(&mut self.iface).await?.bias().read() as i8)
    }

    pub async fn write_accumulation_bias_raw_async(&mut self, value: i8) -> Result<(), I::Error> {
        params::Ab::new(|reg| reg.bias().write(value as u8))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_age_scalar_async(&mut self) -> Result<u8, I::Error> {
        Ok(As::read_async(&mut self.iface).await?.scalar().read())
    }

    pub async fn write_age_scalar_async(&mut self, value: u8) -> Result<(), I::Error> {
        As::new(|reg| reg.scalar().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_full_capacity_raw_async(&mut self) -> Result<u16, I::Error> {
        Ok(Full::read_async(&mut self.iface).await?.capacity().read())
    }

    pub async fn read_active_empty_raw_async(&mut self) -> Result<u16, I::Error> {
        Ok(Ae::read_async(&mut self.iface).await?.capacity().read())
    }

    pub async fn read_standby_empty_raw_async(&mut self) -> Result<u16, I::Error> {
        Ok(Se::read_async(&mut self.iface).await?.capacity().read())
    }

    pub async fn read_control_async(&mut self) -> Result<params::Control, I::Error> {
        params::Control::read_async(&mut self.iface).await
    }

    pub async fn modify_control_async(
        &mut self,
        f: impl FnOnce(params::Control) -> params::Control,
    ) -> Result<(), I::Error> {
        let control = params::Control::read_async(&mut self.iface).await?;
        control.modify(f).write_async(&mut self.iface).await
    }

    pub async fn read_special_feature_async(&mut self) -> Result<Sfr, I::Error> {
        Sfr::read_async(&mut self.iface).await
    }

    pub async fn modify_special_feature_async(
        &mut self,
        f: impl FnOnce(Sfr) -> Sfr,
    ) -> Result<(), I::Error> {
        let sfr = Sfr::read_async(&mut self.iface).await?;
        sfr.modify(f).write_async(&mut self.iface).await
    }

    pub async fn read_eeprom_async(&mut self) -> Result<Eeprom, I::Error> {
        Eeprom::read_async(&mut self.iface).await
    }

    pub async fn modify_eeprom_async(
        &mut self,
        f: impl FnOnce(Eeprom) -> Eeprom,
    ) -> Result<(), I::Error> {
        let eeprom = Eeprom::read_async(&mut self.iface).await?;
        eeprom.modify(f).write_async(&mut self.iface).await
    }

    pub async fn read_charge_voltage_async(&mut self) -> Result<u8, I::Error> {
        Ok(params::Vchg::read_async(&mut self.iface).await?.voltage().read())
    }

    pub async fn write_charge_voltage_async(&mut self, value: u8) -> Result<(), I::Error> {
        params::Vchg::new(|reg| reg.voltage().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_minimum_charge_current_async(&mut self) -> Result<u8, I::Error> {
        Ok(params::Imin::read_async(&mut self.iface).await?.current().read())
    }

    pub async fn write_minimum_charge_current_async(&mut self, value: u8) -> Result<(), I::Error> {
        params::Imin::new(|reg| reg.current().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_active_empty_voltage_async(&mut self) -> Result<u8, I::Error> {
        Ok(params::Vae::read_async(&mut self.iface).await?.voltage().read())
    }

    pub async fn write_active_empty_voltage_async(&mut self, value: u8) -> Result<(), I::Error> {
        params::Vae::new(|reg| reg.voltage().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_active_empty_current_async(&mut self) -> Result<u8, I::Error> {
        Ok(params::Iae::read_async(&mut self.iface).await?.current().read())
    }

    pub async fn write_active_empty_current_async(&mut self, value: u8) -> Result<(), I::Error> {
        params::Iae::new(|reg| reg.current().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_sense_resistor_prime_async(&mut self) -> Result<u8, I::Error> {
        Ok(params::Rsnsp::read_async(&mut self.iface).await?.conductance().read())
    }

    pub async fn write_sense_resistor_prime_async(&mut self, value: u8) -> Result<(), I::Error> {
        params::Rsnsp::new(|reg| reg.conductance().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_sense_resistor_gain_async(&mut self) -> Result<u16, I::Error> {
        Ok(params::Rsgain::read_async(&mut self.iface).await?.gain().read())
    }

    pub async fn write_sense_resistor_gain_async(&mut self, value: u16) -> Result<(), I::Error> {
        params::Rsgain::new(|reg| reg.gain().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_factory_gain_async(&mut self) -> Result<u16, I::Error> {
        Ok(params::Frsgain::read_async(&mut self.iface).await?.gain().read())
    }

    pub async fn read_aging_capacity_raw_async(&mut self) -> Result<u16, I::Error> {
        Ok(params::Ac::read_async(&mut self.iface).await?.capacity().read())
    }

    pub async fn write_aging_capacity_raw_async(&mut self, value: u16) -> Result<(), I::Error> {
        params::Ac::new(|reg| reg.capacity().write(value))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn read_user_eeprom_word_async(&mut self, offset: u8) -> Result<u16, I::Error> {
        let mut data = [0; 2];
        self.iface
            .read_sequential_async(USER_EEPROM_1 + offset, &mut data)
            .await?;
        Ok(BigEndian::read_u16(&data))
    }

    pub async fn write_user_eeprom_word_async(
        &mut self,
        offset: u8,
        value: u16,
    ) -> Result<(), I::Error> {
        let mut data = [0; 2];
        BigEndian::write_u16(&mut data, value);
        self.iface
            .write_sequential_async(USER_EEPROM_1 + offset, &data)
            .await
    }

    pub async fn read_unique_id_async(&mut self) -> Result<[u8; UNIQUE_ID_LEN], I::Error> {
        let mut id = [0; UNIQUE_ID_LEN];
        self.iface.read_sequential_async(UNIQUE_ID, &mut id).await?;
        Ok(id)
    }

    pub async fn do_function_command_async(
        &mut self,
        command: FunctionCommand,
    ) -> Result<(), I::Error> {
        Command::new(|reg| reg.opcode().write(command as u8))
            .write_async(&mut self.iface)
            .await
    }

    pub async fn do_copy_data_async(&mut self, block: u8) -> Result<(), I::Error> {
        match block_command(block, FunctionCommand::CopyBlock0, FunctionCommand::CopyBlock1) {
            Some(command) => self.do_function_command_async(command).await,
            None => Ok(()),
        }
    }

    pub async fn do_recall_data_async(&mut self, block: u8) -> Result<(), I::Error> {
        match block_command(
            block,
            FunctionCommand::RecallBlock0,
            FunctionCommand::RecallBlock1,
        ) {
            Some(command) => self.do_function_command_async(command).await,
            None => Ok(()),
        }
    }

    pub async fn do_lock_data_async(&mut self, block: u8) -> Result<(), I::Error> {
        match block_command(block, FunctionCommand::LockBlock0, FunctionCommand::LockBlock1) {
            Some(command) => self.do_function_command_async(command).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use super::*;
    use embedded_hal::i2c::Operation;

    /// Register-array bus fake. The first byte of a write latches the
    /// register pointer; remaining written bytes and all reads transfer
    /// data at the pointer, post-incrementing.
    struct DummyI2c {
        regs: [u8; 256],
        transactions: usize,
    }

    impl DummyI2c {
        fn new() -> Self {
            Self {
                regs: [0; 256],
                transactions: 0,
            }
        }
    }

    impl embedded_hal::i2c::ErrorType for DummyI2c {
        type Error = core::convert::Infallible;
    }

    impl embedded_hal::i2c::I2c for DummyI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, DEFAULT_ADDRESS);
            self.transactions += 1;

            let mut pointer = None;
            for operation in operations.iter_mut() {
                match operation {
                    Operation::Write(bytes) => {
                        for byte in bytes.iter() {
                            match pointer {
                                None => pointer = Some(*byte as usize),
                                Some(p) => {
                                    self.regs[p] = *byte;
                                    pointer = Some(p + 1);
                                }
                            }
                        }
                    }
                    Operation::Read(buffer) => {
                        let mut p = pointer.expect("read without a register address");
                        for byte in buffer.iter_mut() {
                            *byte = self.regs[p];
                            p += 1;
                        }
                        pointer = Some(p);
                    }
                }
            }

            Ok(())
        }
    }

    fn gauge() -> Ds2782<DummyI2c> {
        Ds2782::new(DummyI2c::new(), DEFAULT_ADDRESS, SenseResistor::new(0.02))
    }

    fn gauge_with(fill: &[(usize, u8)]) -> Ds2782<DummyI2c> {
        let mut gauge = gauge();
        for &(address, value) in fill {
            gauge.inner_mut().regs[address] = value;
        }
        gauge
    }

    #[test]
    fn word_writes_transmit_msb_first() {
        let mut gauge = gauge();

        gauge.write_sense_resistor_gain(0x1234).unwrap();

        assert_eq!(gauge.inner_mut().regs[0x78], 0x12);
        assert_eq!(gauge.inner_mut().regs[0x79], 0x34);
    }

    #[test]
    fn word_reads_decode_msb_first() {
        let mut gauge = gauge_with(&[(0x10, 0x56), (0x11, 0x78)]);

        assert_eq!(gauge.read_accumulated_current_raw().unwrap(), 0x5678);
    }

    #[test]
    fn word_registers_round_trip() {
        let mut gauge = gauge();

        gauge.write_accumulated_current_raw(0xABCD).unwrap();
        assert_eq!(gauge.read_accumulated_current_raw().unwrap(), 0xABCD);

        gauge.write_aging_capacity_raw(0x0102).unwrap();
        assert_eq!(gauge.read_aging_capacity_raw().unwrap(), 0x0102);
    }

    #[test]
    fn user_eeprom_words_round_trip_through_the_sequential_path() {
        let mut gauge = gauge();

        gauge.write_user_eeprom_word(4, 0xBEEF).unwrap();

        assert_eq!(gauge.inner_mut().regs[0x24], 0xBE);
        assert_eq!(gauge.inner_mut().regs[0x25], 0xEF);
        assert_eq!(gauge.read_user_eeprom_word(4).unwrap(), 0xBEEF);
    }

    #[test]
    fn status_flags_decode() {
        let mut gauge = gauge_with(&[(0x01, 0b0000_0001)]);

        let status = gauge.read_status().unwrap();
        assert!(status.chgtf().read());
        assert!(!status.aef().read());
        assert!(!status.sef().read());
        assert!(!status.learnf().read());
        assert!(!status.uvf().read());
        assert!(!status.porf().read());

        gauge.inner_mut().regs[0x01] = 0b0010_0000;
        let status = gauge.read_status().unwrap();
        assert!(status.uvf().read());
        assert!(!status.chgtf().read());

        gauge.inner_mut().regs[0x01] = 0b0100_0000;
        let status = gauge.read_status().unwrap();
        assert!(status.porf().read());
        assert!(!status.uvf().read());
    }

    #[test]
    fn modify_preserves_reserved_bits() {
        let mut gauge = gauge_with(&[(0x60, 0b1000_0001)]);

        gauge.modify_control(|control| control.uven().write(true)).unwrap();

        assert_eq!(gauge.inner_mut().regs[0x60], 0b1000_0011);
    }

    #[test]
    fn invalid_block_commands_perform_no_bus_transaction() {
        let mut gauge = gauge();

        gauge.do_copy_data(2).unwrap();
        gauge.do_recall_data(3).unwrap();
        gauge.do_lock_data(0xFF).unwrap();

        assert_eq!(gauge.inner_mut().transactions, 0);
    }

    #[test]
    fn block_commands_write_their_opcodes() {
        let mut gauge = gauge();

        #[rustfmt::skip]
        let table = [
            (0u8, 0x42u8, 0xB2u8, 0x63u8),
            (1, 0x44, 0xB4, 0x66),
        ];

        for (block, copy, recall, lock) in table {
            gauge.do_copy_data(block).unwrap();
            assert_eq!(gauge.inner_mut().regs[0xFE], copy);

            gauge.do_recall_data(block).unwrap();
            assert_eq!(gauge.inner_mut().regs[0xFE], recall);

            gauge.do_lock_data(block).unwrap();
            assert_eq!(gauge.inner_mut().regs[0xFE], lock);
        }
    }

    #[test]
    fn voltage_transfer_is_linear_and_odd() {
        for raw in [1i16, 100, 5000, 16384] {
            assert_eq!(raw_voltage_to_volts(-raw), -raw_voltage_to_volts(raw));
        }

        assert_eq!(raw_voltage_to_volts(16384), 2.5);
        assert_eq!(raw_voltage_to_volts(0), 0.0);
    }

    #[test]
    fn voltage_reads_flip_the_raw_sign() {
        let mut gauge = gauge_with(&[(0x0C, 0x40), (0x0D, 0x00)]);
        assert_eq!(gauge.read_voltage().unwrap(), -2.5);

        // -16384 raw
        gauge.inner_mut().regs[0x0C] = 0xC0;
        gauge.inner_mut().regs[0x0D] = 0x00;
        assert_eq!(gauge.read_voltage().unwrap(), 2.5);
    }

    #[test]
    fn current_scales_inversely_with_sense_resistance() {
        let unit = SenseResistor::new(1.0);

        for ohms in [0.01f32, 0.02, 0.05, 1.0] {
            let rsns = SenseResistor::new(ohms);
            for raw in [-200i16, -1, 0, 100, 5000] {
                assert_eq!(rsns.raw_current_to_ma(raw), unit.raw_current_to_ma(raw) / ohms);
            }
        }
    }

    #[test]
    fn capacity_conversion_ignores_the_sense_resistor() {
        assert_eq!(raw_capacity_to_mah(100), 160.0);

        let mut gauge = gauge_with(&[(0x02, 0x00), (0x03, 100)]);
        assert_eq!(
            gauge.read_remaining_active_absolute_capacity().unwrap(),
            160.0
        );
    }

    #[test]
    fn current_scenario_from_the_datasheet() {
        // 100 LSB across 20 mΩ: (100 * 0.1/64 mV) / 0.02 Ω ≈ 7.8125 mA
        let mut gauge = gauge_with(&[(0x0E, 0x00), (0x0F, 100)]);

        let current = gauge.read_current().unwrap();
        assert!((current - 7.8125).abs() < 1e-3);

        let sense_mv = gauge.read_sense_resistor_voltage().unwrap();
        assert!((sense_mv - 0.15625).abs() < 1e-6);
    }

    #[test]
    fn temperature_reads_convert_to_celsius() {
        let mut gauge = gauge_with(&[(0x0A, 0x19), (0x0B, 0x00)]);
        assert_eq!(gauge.read_temperature().unwrap(), 25.0);

        // -6400 raw
        gauge.inner_mut().regs[0x0A] = 0xE7;
        gauge.inner_mut().regs[0x0B] = 0x00;
        assert_eq!(gauge.read_temperature().unwrap(), -25.0);
    }

    #[test]
    fn relative_capacities_read_raw_percent() {
        let mut gauge = gauge_with(&[(0x06, 55), (0x07, 93)]);

        assert_eq!(gauge.read_remaining_active_relative_capacity().unwrap(), 55);
        assert_eq!(gauge.read_remaining_standby_relative_capacity().unwrap(), 93);
    }

    #[test]
    fn unique_id_reads_the_whole_block() {
        let mut gauge = gauge();
        for (index, value) in (1..=8).enumerate() {
            gauge.inner_mut().regs[0xF0 + index] = value;
        }

        assert_eq!(
            gauge.read_unique_id().unwrap(),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn every_call_is_a_single_transaction() {
        let mut gauge = gauge();

        gauge.read_voltage().unwrap();
        assert_eq!(gauge.inner_mut().transactions, 1);

        gauge.write_charge_voltage(0x41).unwrap();
        assert_eq!(gauge.inner_mut().transactions, 2);

        gauge.read_user_eeprom_word(0).unwrap();
        assert_eq!(gauge.inner_mut().transactions, 3);
    }
}
