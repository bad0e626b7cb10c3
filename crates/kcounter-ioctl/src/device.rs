use std::path::Path;

use crate::command::RequestCode;

/// Argument passed alongside a request.
#[derive(Debug)]
pub enum Payload<'a> {
    /// Payload-less command; the kernel receives a null argument.
    None,
    /// Buffer the driver writes into.
    Read(&'a mut [u8]),
}

impl Payload<'_> {
    pub fn len(&self) -> usize {
        match self {
            Payload::None => 0,
            Payload::Read(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An open handle to a device node.
///
/// Handles are owned by one thread from open to close. [`close`](Self::close)
/// consumes the handle, so it runs at most once.
pub trait ControlHandle {
    /// Issue one control call. Returns the OS error the driver reported
    /// when the call fails.
    fn send_command(&mut self, request: RequestCode, payload: Payload<'_>) -> std::io::Result<()>;

    /// Release the handle.
    fn close(self) -> std::io::Result<()>
    where
        Self: Sized;
}

/// Something that can be opened into a [`ControlHandle`].
pub trait DeviceNode {
    type Handle: ControlHandle;

    /// Open `path` for read-write access.
    fn open(&self, path: &Path) -> std::io::Result<Self::Handle>;
}

impl<N: DeviceNode + ?Sized> DeviceNode for &N {
    type Handle = N::Handle;

    fn open(&self, path: &Path) -> std::io::Result<Self::Handle> {
        (**self).open(path)
    }
}
