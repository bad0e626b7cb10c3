use std::fmt;

/// ioctl "magic" byte shared by every kcounter command.
pub const KCOUNTER_MAGIC: u8 = b'|';

/// Capacity of the buffer carried by [`Command::ReadMessage`].
pub const MESSAGE_CAPACITY: usize = 256;

/// Ordinal of [`Command::UnsupportedProbe`].
pub(crate) const UNSUPPORTED_PROBE_NR: u8 = 0;
/// Ordinal of [`Command::ReadMessage`].
pub(crate) const READ_MESSAGE_NR: u8 = 0x83;

// mips, powerpc and sparc (and the BSDs) use a 3-bit direction field with
// none=1, read=2, write=4 and a 13-bit size. Everything else uses the
// asm-generic 2-bit field with none=0, write=1, read=2 and a 14-bit size.
#[cfg(any(
    target_arch = "mips",
    target_arch = "mips32r6",
    target_arch = "mips64",
    target_arch = "mips64r6",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc",
    target_arch = "sparc64",
    not(any(target_os = "linux", target_os = "android"))
))]
mod layout {
    pub const SIZE_BITS: u32 = 13;
    pub const DIR_BITS: u32 = 3;
    pub const DIR_NONE: u32 = 1;
    pub const DIR_READ: u32 = 2;
    pub const DIR_WRITE: u32 = 4;
}

#[cfg(not(any(
    target_arch = "mips",
    target_arch = "mips32r6",
    target_arch = "mips64",
    target_arch = "mips64r6",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc",
    target_arch = "sparc64",
    not(any(target_os = "linux", target_os = "android"))
)))]
mod layout {
    pub const SIZE_BITS: u32 = 14;
    pub const DIR_BITS: u32 = 2;
    pub const DIR_NONE: u32 = 0;
    pub const DIR_READ: u32 = 2;
    pub const DIR_WRITE: u32 = 1;
}

const DIR_READ_WRITE: u32 = layout::DIR_READ | layout::DIR_WRITE;

const NR_BITS: u32 = 8;
const TYPE_BITS: u32 = 8;

const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = NR_SHIFT + NR_BITS;
const SIZE_SHIFT: u32 = TYPE_SHIFT + TYPE_BITS;
const DIR_SHIFT: u32 = SIZE_SHIFT + layout::SIZE_BITS;

/// Largest payload size the target's size field can describe.
pub const MAX_PAYLOAD_SIZE: usize = (1 << layout::SIZE_BITS) - 1;

// nix masks oversized sizes silently; refuse to build instead.
const _: () = assert!(MESSAGE_CAPACITY <= MAX_PAYLOAD_SIZE);

const UNSUPPORTED_PROBE: RequestCode =
    RequestCode(nix::request_code_none!(KCOUNTER_MAGIC, UNSUPPORTED_PROBE_NR) as u32);
const READ_MESSAGE: RequestCode = RequestCode(nix::request_code_read!(
    KCOUNTER_MAGIC,
    READ_MESSAGE_NR,
    MESSAGE_CAPACITY
) as u32);

/// Data direction of an ioctl, seen from userspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// No payload.
    None,
    /// Userspace writes to the driver.
    Write,
    /// The driver writes into a userspace buffer.
    Read,
    /// Both.
    ReadWrite,
}

impl Direction {
    const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            layout::DIR_NONE => Some(Direction::None),
            layout::DIR_WRITE => Some(Direction::Write),
            layout::DIR_READ => Some(Direction::Read),
            DIR_READ_WRITE => Some(Direction::ReadWrite),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::Write => "write",
            Direction::Read => "read",
            Direction::ReadWrite => "read-write",
        }
    }
}

/// An encoded ioctl request number, as built by `_IOC`.
///
/// Field order is fixed; the direction and size widths depend on the target:
/// ```text
/// ┌───────────┬────────────────┬──────────┬──────────┐
/// │ dir       │ size           │ type (8b)│ nr (8b)  │
/// │ 2b / 3b   │ 14b / 13b      │ 15..8    │ 7..0     │
/// └───────────┴────────────────┴──────────┴──────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestCode(u32);

impl RequestCode {
    /// Wrap a raw request number, e.g. one received on the driver side.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// `None` when the direction bits hold a value the layout does not define.
    pub const fn direction(self) -> Option<Direction> {
        Direction::from_bits((self.0 >> DIR_SHIFT) & ((1 << layout::DIR_BITS) - 1))
    }

    /// The "magic" type byte.
    pub const fn kind(self) -> u8 {
        ((self.0 >> TYPE_SHIFT) & ((1 << TYPE_BITS) - 1)) as u8
    }

    /// The ordinal within the type group.
    pub const fn number(self) -> u8 {
        ((self.0 >> NR_SHIFT) & ((1 << NR_BITS) - 1)) as u8
    }

    /// Payload size in bytes, the `_IOC_SIZE` of the request.
    pub const fn size(self) -> usize {
        ((self.0 >> SIZE_SHIFT) & ((1 << layout::SIZE_BITS) - 1)) as usize
    }
}

impl fmt::Debug for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCode")
            .field("raw", &format_args!("{:#010x}", self.0))
            .field("dir", &self.direction())
            .field("type", &(self.kind() as char))
            .field("nr", &self.number())
            .field("size", &self.size())
            .finish()
    }
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The commands understood (or deliberately not understood) by kcounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `_IO('|', 0)`: no payload, no defined behaviour. The driver must reject it.
    UnsupportedProbe,
    /// `_IOR('|', 0x83, [u8; 256])`: fills the buffer with a NUL-terminated message.
    ReadMessage,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::UnsupportedProbe, Command::ReadMessage];

    pub const fn request(self) -> RequestCode {
        match self {
            Command::UnsupportedProbe => UNSUPPORTED_PROBE,
            Command::ReadMessage => READ_MESSAGE,
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Command::UnsupportedProbe => Direction::None,
            Command::ReadMessage => Direction::Read,
        }
    }

    pub const fn payload_size(self) -> usize {
        match self {
            Command::UnsupportedProbe => 0,
            Command::ReadMessage => MESSAGE_CAPACITY,
        }
    }

    /// Recognise an encoded request. The whole value has to match; a request
    /// with the right ordinal but a different size or direction is unknown.
    pub fn from_request(request: RequestCode) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.request() == request)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::UnsupportedProbe => "unsupported-probe",
            Command::ReadMessage => "read-message",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.request())
    }
}
