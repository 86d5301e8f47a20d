use crate::event::{PointerId, RawEvent};

pub(super) fn squared_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

pub(super) fn action_pointer_id(event: &RawEvent) -> Option<PointerId> {
    event.action_pointer().map(|pointer| pointer.id)
}

pub(super) fn saturating_u16(value: usize) -> u16 {
    value.min(u16::MAX as usize) as u16
}
