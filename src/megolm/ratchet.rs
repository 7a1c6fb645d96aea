use crate::Error;
use crate::crypto::{hmac_sha256, random_bytes};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub(crate) const RATCHET_PARTS: usize = 4;
pub(crate) const RATCHET_PART_LENGTH: usize = 32;
pub(crate) const RATCHET_LENGTH: usize = RATCHET_PARTS * RATCHET_PART_LENGTH;

/// The Megolm ratchet: four 32-byte parts `R0..R3` and a counter.
///
/// `R0` is rehashed every 2^24 messages, `R1` every 2^16, `R2` every 2^8 and
/// `R3` on every message. A part is only ever derived from a part with a
/// lower or equal number, so jumping ahead costs at most 4 * 255 hashes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct MegolmRatchet {
    parts: Box<[[u8; RATCHET_PART_LENGTH]; RATCHET_PARTS]>,
    counter: u32,
}

impl MegolmRatchet {
    /// A ratchet seeded from the operating system RNG, starting at index 0.
    pub(crate) fn new() -> Result<Self, Error> {
        let seed = random_bytes::<RATCHET_LENGTH>()
            .map_err(|err| Error::KeyGeneration(err.to_string()))?;
        Ok(Self::from_bytes(&seed, 0))
    }

    pub(crate) fn from_bytes(bytes: &[u8; RATCHET_LENGTH], counter: u32) -> Self {
        let mut parts = Box::new([[0u8; RATCHET_PART_LENGTH]; RATCHET_PARTS]);
        for (part, chunk) in parts.iter_mut().zip(bytes.chunks_exact(RATCHET_PART_LENGTH)) {
            part.copy_from_slice(chunk);
        }

        Self { parts, counter }
    }

    pub(crate) fn from_slice(bytes: &[u8], counter: u32) -> Option<Self> {
        let bytes: &[u8; RATCHET_LENGTH] = bytes.try_into().ok()?;
        Some(Self::from_bytes(bytes, counter))
    }

    /// The concatenated parts `R0 || R1 || R2 || R3`.
    pub(crate) fn to_bytes(&self) -> Box<[u8; RATCHET_LENGTH]> {
        let mut bytes = Box::new([0u8; RATCHET_LENGTH]);
        for (chunk, part) in bytes.chunks_exact_mut(RATCHET_PART_LENGTH).zip(self.parts.iter()) {
            chunk.copy_from_slice(part);
        }
        bytes
    }

    pub(crate) fn index(&self) -> u32 {
        self.counter
    }

    fn rehash_part(&mut self, from: usize, to: usize) -> Result<(), Error> {
        let seed = [to as u8];
        self.parts[to] = hmac_sha256(&self.parts[from], &seed)?;
        Ok(())
    }

    /// Moves the ratchet forward by one message.
    pub(crate) fn advance(&mut self) -> Result<(), Error> {
        let mut mask: u32 = 0x00FF_FFFF;
        let mut h = 0;

        self.counter = self.counter.wrapping_add(1);

        // Find the lowest part whose period just rolled over.
        while h < RATCHET_PARTS {
            if self.counter & mask == 0 {
                break;
            }
            h += 1;
            mask >>= 8;
        }

        for i in (h..RATCHET_PARTS).rev() {
            self.rehash_part(h, i)?;
        }

        Ok(())
    }

    /// Moves the ratchet forward to `index`. An `index` below the current
    /// counter wraps around the 2^32 space.
    pub(crate) fn advance_to(&mut self, index: u32) -> Result<(), Error> {
        for j in 0..RATCHET_PARTS {
            let shift = (RATCHET_PARTS - j - 1) * 8;
            let mask = u32::MAX << shift;

            let mut steps = ((index >> shift).wrapping_sub(self.counter >> shift)) & 0xFF;
            if steps == 0 {
                if index < self.counter {
                    steps = 0x100;
                } else {
                    continue;
                }
            }

            // Intermediate steps only need R(j) itself.
            while steps > 1 {
                self.rehash_part(j, j)?;
                steps -= 1;
            }

            // The last step also reseeds R(j+1)...R(3) from R(j).
            for k in (j..RATCHET_PARTS).rev() {
                self.rehash_part(j, k)?;
            }

            self.counter = index & mask;
        }

        Ok(())
    }
}
