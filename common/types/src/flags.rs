use bitflags::bitflags;

bitflags! {
    /// `Account::config_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct ConfigFlags: u32 {
        /// The account is scheduled for deletion.
        const SCHEDULED_FOR_DELETION = accounts_constants::config_flags::SCHEDULED_FOR_DELETION;
    }
}

bitflags! {
    /// `Account::status_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct StatusFlags: u32 {
        /// The fetch client has reported this account unreachable.
        const UNREACHABLE = accounts_constants::status_flags::UNREACHABLE;
        /// A saturating arithmetic operation clamped instead of wrapping.
        const OVERFLOWN = accounts_constants::status_flags::OVERFLOWN;
    }
}
