use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::money::Money;

/// system configuration store consulted by the fee generation triggers;
/// engines always receive the current rate as an argument and never read
/// this ambiently
pub trait ConfigStore {
    fn default_government_fee(&self) -> Result<Money>;
    fn set_default_government_fee(&mut self, amount: Money) -> Result<()>;
}

/// in-memory configuration, suitable for tests and single-process callers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryConfig {
    default_government_fee: Money,
}

impl InMemoryConfig {
    pub fn new(default_government_fee: Money) -> Self {
        Self {
            default_government_fee,
        }
    }
}

impl ConfigStore for InMemoryConfig {
    fn default_government_fee(&self) -> Result<Money> {
        Ok(self.default_government_fee)
    }

    fn set_default_government_fee(&mut self, amount: Money) -> Result<()> {
        self.default_government_fee = amount;
        Ok(())
    }
}
