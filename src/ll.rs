use byteorder::{BigEndian, ByteOrder};
use device_descriptor::{ReadOnlyRegister, Register};
use embedded_hal::i2c::{I2c, Operation};
use embedded_hal_async::i2c::I2c as AsyncI2c;
use register_access::{
    AsyncRegisterAccess, AsyncSequentialAccess, RegisterAccess, SequentialAccess,
};

/// Factory-default 7-bit bus address.
pub const DEFAULT_ADDRESS: u8 = 0x34;

/// Performs the addressed register transactions of the gauge.
///
/// A read is one write/read bus transaction: an address phase carrying the
/// register address, then a data phase fetching the requested bytes. A write
/// is one write transaction carrying the register address immediately
/// followed by the payload. Words travel MSB first. There is no retry, no
/// caching and no length verification beyond what the bus implementation
/// guarantees.
pub struct Ds2782Interface<I> {
    pub i2c: I,
    address: u8,
}

impl<I> Ds2782Interface<I> {
    pub const fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }
}

impl<I> RegisterAccess<u8> for Ds2782Interface<I>
where
    I: I2c,
{
    type Error = I::Error;

    fn read_register<R>(&mut self) -> Result<R, Self::Error>
    where
        R: ReadOnlyRegister<Width = u8>,
    {
        let mut bits = 0;
        self.i2c
            .write_read(self.address, &[R::ADDRESS], core::slice::from_mut(&mut bits))?;

        logger::trace!("{} -> {}", R::NAME, bits);
        Ok(R::from_bits(bits))
    }

    fn write_register<R>(&mut self, reg: R) -> Result<(), Self::Error>
    where
        R: Register<Width = u8>,
    {
        logger::trace!("{} <- {}", R::NAME, reg.bits());
        self.i2c.write(self.address, &[R::ADDRESS, reg.bits()])
    }
}

impl<I> RegisterAccess<u16> for Ds2782Interface<I>
where
    I: I2c,
{
    type Error = I::Error;

    fn read_register<R>(&mut self) -> Result<R, Self::Error>
    where
        R: ReadOnlyRegister<Width = u16>,
    {
        let mut data = [0; 2];
        self.i2c.write_read(self.address, &[R::ADDRESS], &mut data)?;

        let bits = BigEndian::read_u16(&data);
        logger::trace!("{} -> {}", R::NAME, bits);
        Ok(R::from_bits(bits))
    }

    fn write_register<R>(&mut self, reg: R) -> Result<(), Self::Error>
    where
        R: Register<Width = u16>,
    {
        logger::trace!("{} <- {}", R::NAME, reg.bits());

        let mut data = [R::ADDRESS, 0, 0];
        BigEndian::write_u16(&mut data[1..], reg.bits());
        self.i2c.write(self.address, &data)
    }
}

impl<I> SequentialAccess for Ds2782Interface<I>
where
    I: I2c,
{
    type Error = I::Error;

    fn read_sequential(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[address], buffer)
    }

    fn write_sequential(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.i2c.transaction(
            self.address,
            &mut [Operation::Write(&[address]), Operation::Write(data)],
        )
    }
}

impl<I> AsyncRegisterAccess<u8> for Ds2782Interface<I>
where
    I: AsyncI2c,
{
    type Error = I::Error;

    async fn read_register_async<R>(&mut self) -> Result<R, Self::Error>
    where
        R: ReadOnlyRegister<Width = u8>,
    {
        let mut bits = 0;
        self.i2c
            .write_read(self.address, &[R::ADDRESS], core::slice::from_mut(&mut bits))
            .await?;

        logger::trace!("{} -> {}", R::NAME, bits);
        Ok(R::from_bits(bits))
    }

    async fn write_register_async<R>(&mut self, reg: R) -> Result<(), Self::Error>
    where
        R: Register<Width = u8>,
    {
        logger::trace!("{} <- {}", R::NAME, reg.bits());
        self.i2c.write(self.address, &[R::ADDRESS, reg.bits()]).await
    }
}

impl<I> AsyncRegisterAccess<u16> for Ds2782Interface<I>
where
    I: AsyncI2c,
{
    type Error = I::Error;

    async fn read_register_async<R>(&mut self) -> Result<R, Self::Error>
    where
        R: ReadOnlyRegister<Width = u16>,
    {
        let mut data = [0; 2];
        self.i2c
            .write_read(self.address, &[R::ADDRESS], &mut data)
            .await?;

        let bits = BigEndian::read_u16(&data);
        logger::trace!("{} -> {}", R::NAME, bits);
        Ok(R::from_bits(bits))
    }

    async fn write_register_async<R>(&mut self, reg: R) -> Result<(), Self::Error>
    where
        R: Register<Width = u16>,
    {
        logger::trace!("{} <- {}", R::NAME, reg.bits());

        let mut data = [R::ADDRESS, 0, 0];
        BigEndian::write_u16(&mut data[1..], reg.bits());
        self.i2c.write(self.address, &data).await
    }
}

impl<I> AsyncSequentialAccess for Ds2782Interface<I>
where
    I: AsyncI2c,
{
    type Error = I::Error;

    async fn read_sequential_async(
        &mut self,
        address: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[address], buffer).await
    }

    async fn write_sequential_async(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.i2c
            .transaction(
                self.address,
                &mut [Operation::Write(&[address]), Operation::Write(data)],
            )
            .await
    }
}
