/// Which input sources produce ticks, and how device ticks are oriented.
#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    /// Swaps the directions of the two device tick kinds.
    #[knuffel(child)]
    pub invert_device_ticks: bool,
    #[knuffel(child)]
    pub ignore_wheel: bool,
    #[knuffel(child)]
    pub ignore_keys: bool,
}
