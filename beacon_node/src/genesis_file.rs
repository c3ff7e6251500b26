use serde_derive::Deserialize;
use types::{Deposit, DepositData, Hash256, PublicKey, Signature};

/// The parsed genesis document: the initial deposits and the genesis time.
pub struct Genesis {
    pub genesis_time: u64,
    pub deposits: Vec<Deposit>,
}

#[derive(Deserialize)]
struct GenesisJson {
    genesis_time: u64,
    deposits: Vec<GenesisDepositJson>,
}

/// One deposit entry of the genesis file, in the flat layout the deposit
/// tooling emits.
#[derive(Deserialize)]
struct GenesisDepositJson {
    pubkey: PublicKey,
    withdrawal_credentials: Hash256,
    amount: u64,
    signature: Signature,
    #[serde(default)]
    proof: Vec<Hash256>,
}

/// Reads and parses the genesis JSON document at `path`. Deposit indices
/// are assigned by position.
pub fn load(path: &str) -> Result<Genesis, String> {
    let file = std::fs::File::open(path).map_err(|e| format!("{}", e))?;
    let json: GenesisJson = serde_json::from_reader(file).map_err(|e| format!("{}", e))?;

    let deposits = json
        .deposits
        .into_iter()
        .enumerate()
        .map(|(index, entry)| Deposit {
            proof: entry.proof,
            index: index as u64,
            deposit_data: DepositData {
                pubkey: entry.pubkey,
                withdrawal_credentials: entry.withdrawal_credentials,
                amount: entry.amount,
                signature: entry.signature,
            },
        })
        .collect();

    Ok(Genesis {
        genesis_time: json.genesis_time,
        deposits,
    })
}
