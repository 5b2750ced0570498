#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

/// Target bond for SMARTS matching.
///
/// Directional `/` and `\` query bonds match any single bond; cis/trans
/// configuration is not checked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bond {
    pub order: BondOrder,
    pub in_ring: bool,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self {
            order,
            in_ring: false,
        }
    }

    pub fn ring(order: BondOrder) -> Self {
        Self {
            order,
            in_ring: true,
        }
    }
}
