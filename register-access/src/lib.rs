#![no_std]
#![allow(async_fn_in_trait)]

//! Transfer traits that connect `device-descriptor` register types to a bus
//! interface, in blocking and async flavors.

use device_descriptor::{ReadOnlyRegister, Register, RegisterWidth};

/// Register-addressed transfers of a single width class.
///
/// An interface type implements this once per register width it supports;
/// the register type selects the instantiation through its `Width`.
pub trait RegisterAccess<RWT: RegisterWidth> {
    type Error;

    fn read_register<R>(&mut self) -> Result<R, Self::Error>
    where
        R: ReadOnlyRegister<Width = RWT>;

    fn write_register<R>(&mut self, reg: R) -> Result<(), Self::Error>
    where
        R: Register<Width = RWT>;
}

pub trait AsyncRegisterAccess<RWT: RegisterWidth> {
    type Error;

    async fn read_register_async<R>(&mut self) -> Result<R, Self::Error>
    where
        R: ReadOnlyRegister<Width = RWT>;

    async fn write_register_async<R>(&mut self, reg: R) -> Result<(), Self::Error>
    where
        R: Register<Width = RWT>;
}

/// Byte transfers starting at a caller-supplied address, for memory ranges
/// that are not described as typed registers (user and parameter EEPROM,
/// factory ID blocks).
pub trait SequentialAccess {
    type Error;

    fn read_sequential(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;
    fn write_sequential(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;
}

pub trait AsyncSequentialAccess {
    type Error;

    async fn read_sequential_async(
        &mut self,
        address: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;

    async fn write_sequential_async(&mut self, address: u8, data: &[u8])
        -> Result<(), Self::Error>;
}

/// Lets a register type pull itself off an interface:
/// `Status::read(&mut iface)`.
pub trait RegisterReader: ReadOnlyRegister {
    fn read<E>(iface: &mut impl RegisterAccess<Self::Width, Error = E>) -> Result<Self, E>;

    async fn read_async<E>(
        iface: &mut impl AsyncRegisterAccess<Self::Width, Error = E>,
    ) -> Result<Self, E>;
}

impl<T: ReadOnlyRegister> RegisterReader for T {
    fn read<E>(iface: &mut impl RegisterAccess<T::Width, Error = E>) -> Result<Self, E> {
        iface.read_register()
    }

    async fn read_async<E>(
        iface: &mut impl AsyncRegisterAccess<T::Width, Error = E>,
    ) -> Result<Self, E> {
        iface.read_register_async().await
    }
}

/// Write-back counterpart of [`RegisterReader`].
pub trait RegisterWriter: Register {
    fn write<E>(self, iface: &mut impl RegisterAccess<Self::Width, Error = E>) -> Result<(), E>;

    async fn write_async<E>(
        self,
        iface: &mut impl AsyncRegisterAccess<Self::Width, Error = E>,
    ) -> Result<(), E>;
}

impl<T: Register> RegisterWriter for T {
    fn write<E>(self, iface: &mut impl RegisterAccess<T::Width, Error = E>) -> Result<(), E> {
        iface.write_register(self)
    }

    async fn write_async<E>(
        self,
        iface: &mut impl AsyncRegisterAccess<T::Width, Error = E>,
    ) -> Result<(), E> {
        iface.write_register_async(self).await
    }
}
