use crate::PublicKey;
use blst::min_pk as blst_core;

/// An aggregation of BLS public keys, one per participating validator.
#[derive(Clone)]
pub struct AggregatePublicKey {
    point: Option<blst_core::AggregatePublicKey>,
}

impl AggregatePublicKey {
    pub fn new() -> Self {
        Self { point: None }
    }

    pub fn add(&mut self, pk: &PublicKey) {
        match &mut self.point {
            Some(point) => {
                // Keys were validated on construction; re-validation here
                // would be quadratic over committee processing.
                point
                    .add_public_key(&pk.0, false)
                    .expect("validated key aggregates");
            }
            None => self.point = Some(blst_core::AggregatePublicKey::from_public_key(&pk.0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_none()
    }

    pub(crate) fn to_public_key(&self) -> Option<blst_core::PublicKey> {
        self.point.as_ref().map(|point| point.to_public_key())
    }
}

impl Default for AggregatePublicKey {
    fn default() -> Self {
        Self::new()
    }
}
