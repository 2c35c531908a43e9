use serde::{Deserialize, Serialize};

use crate::budget::{BudgetError, PacketBudget, MTU_SIZE};

/// Customized config for creating a [`PacketBudget`].
///
/// ```
/// use relay_budget::BudgetConfig;
///
/// let budget = BudgetConfig::new()
///     .set_mtu(1200)
///     .build()
///     .unwrap();
///
/// assert_eq!(budget.rtcp_compound_budget(), 992);
/// ```
///
/// Only the MTU is configurable. The overhead reserved is always
/// [`Overhead::WORST_CASE`][crate::Overhead::WORST_CASE].
///
/// Configs can be loaded with serde. Missing fields take their defaults,
/// unknown fields are refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    mtu: usize,
}

impl BudgetConfig {
    /// Creates a new default config.
    pub fn new() -> Self {
        BudgetConfig::default()
    }

    /// The configured MTU.
    ///
    /// ```
    /// # use relay_budget::BudgetConfig;
    /// let config = BudgetConfig::new();
    ///
    /// // Defaults to 1500.
    /// assert_eq!(config.mtu(), 1500);
    /// ```
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Set the MTU of the network path.
    ///
    /// This is the size of the whole datagram including IP header.
    pub fn set_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Create a [`PacketBudget`] from the configuration.
    ///
    /// An error here is a configuration error the relay can't run with.
    pub fn build(&self) -> Result<PacketBudget, BudgetError> {
        match PacketBudget::new(self.mtu) {
            Ok(budget) => {
                debug!(
                    "Packet budget: MTU {} overhead {} RTCP {}",
                    budget.mtu(),
                    budget.overhead(),
                    budget.rtcp_compound_budget()
                );
                Ok(budget)
            }
            Err(e) => {
                error!("Refusing packet budget config: {}", e);
                Err(e)
            }
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig { mtu: MTU_SIZE }
    }
}
