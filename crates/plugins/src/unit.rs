use numberone_dispatch::{RegistrationError, UnitRegistrar};

/// A named group of commands and forwards registered together.
///
/// Everything a unit registers is committed only if [`register`] returns
/// `Ok`; a failing unit leaves the dispatcher as it was.
///
/// [`register`]: ExtensionUnit::register
pub trait ExtensionUnit: Send + Sync {
    /// Unique name, used for exactly-once loading and in logs.
    fn name(&self) -> &str;

    fn register(&self, registrar: &mut UnitRegistrar<'_>) -> Result<(), RegistrationError>;
}
