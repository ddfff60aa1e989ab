use super::{AttribBinding, ImmediateDevice};

/// Last attribute bindings programmed into one vertex array.
///
/// Lets consecutive draws under the same pipeline skip re-issuing identical
/// attribute pointers.
#[derive(Debug, Default)]
pub(super) struct AttribArrayState {
    slots: Vec<Option<AttribBinding>>,
}

impl AttribArrayState {
    /// Programs `binding` at `location` unless it is already current.
    ///
    /// Returns true if the device was called.
    pub fn set<D: ImmediateDevice>(&mut self, device: &mut D, location: u32, binding: AttribBinding) -> bool {
        let idx = location as usize;
        if self.slots.len() <= idx {
            self.slots.resize(idx + 1, None);
        }
        if self.slots[idx] == Some(binding) {
            return false;
        }
        device.set_vertex_attrib(location, &binding);
        self.slots[idx] = Some(binding);
        true
    }
}
