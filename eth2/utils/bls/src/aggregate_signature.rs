use crate::{message_with_domain, AggregatePublicKey, Signature, DST};
use blst::min_pk as blst_core;
use blst::BLST_ERROR;

/// An aggregation of BLS signatures over one or more messages.
#[derive(Clone)]
pub struct AggregateSignature {
    point: Option<blst_core::AggregateSignature>,
}

impl AggregateSignature {
    pub fn new() -> Self {
        Self { point: None }
    }

    /// Folds `signature` into the aggregate. Empty signatures are ignored.
    pub fn add(&mut self, signature: &Signature) {
        let sig_point = match signature.point() {
            Some(point) => point,
            None => return,
        };
        match &mut self.point {
            Some(point) => point
                .add_signature(sig_point, false)
                .expect("group-checked signature aggregates"),
            None => self.point = Some(blst_core::AggregateSignature::from_signature(sig_point)),
        }
    }

    /// Folds another aggregate into this one.
    pub fn add_aggregate(&mut self, other: &AggregateSignature) {
        if let Some(other_point) = &other.point {
            let other_sig = other_point.to_signature();
            match &mut self.point {
                Some(point) => point
                    .add_signature(&other_sig, false)
                    .expect("group-checked signature aggregates"),
                None => self.point = Some(blst_core::AggregateSignature::from_signature(&other_sig)),
            }
        }
    }

    /// Verifies the aggregate over a single `message` signed by every key in
    /// `agg_pub`.
    pub fn verify(&self, message: &[u8], domain: u64, agg_pub: &AggregatePublicKey) -> bool {
        self.verify_multiple(&[message], domain, &[agg_pub])
    }

    /// Verifies the aggregate where the keys in `agg_pubs[i]` all signed
    /// `messages[i]`. The slices must be the same length.
    pub fn verify_multiple(
        &self,
        messages: &[&[u8]],
        domain: u64,
        agg_pubs: &[&AggregatePublicKey],
    ) -> bool {
        let point = match &self.point {
            Some(point) => point,
            None => return false,
        };
        if messages.len() != agg_pubs.len() || messages.is_empty() {
            return false;
        }

        let public_keys: Option<Vec<blst_core::PublicKey>> =
            agg_pubs.iter().map(|agg| agg.to_public_key()).collect();
        let public_keys = match public_keys {
            Some(keys) => keys,
            // One of the groups has no participants; nothing can verify.
            None => return false,
        };

        let digests: Vec<Vec<u8>> = messages
            .iter()
            .map(|message| message_with_domain(message, domain))
            .collect();
        let digest_refs: Vec<&[u8]> = digests.iter().map(|d| d.as_slice()).collect();
        let public_key_refs: Vec<&blst_core::PublicKey> = public_keys.iter().collect();

        point.to_signature().aggregate_verify(
            true,
            &digest_refs,
            DST,
            &public_key_refs,
            true,
        ) == BLST_ERROR::BLST_SUCCESS
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BLST_ERROR> {
        let signature = Signature::from_bytes(bytes)?;
        let mut aggregate = Self::new();
        aggregate.add(&signature);
        Ok(aggregate)
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        match &self.point {
            Some(point) => point.to_signature().compress().to_vec(),
            None => Signature::empty_signature().as_bytes(),
        }
    }
}

impl PartialEq for AggregateSignature {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Default for AggregateSignature {
    fn default() -> Self {
        Self::new()
    }
}

impl_byte_wrappers!(AggregateSignature, 96);
