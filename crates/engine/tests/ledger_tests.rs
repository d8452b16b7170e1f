// EDP - EVM Deployment Pipeline
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy_primitives::Address;
use edp_engine::{
    test_utils::pokemon_abi, AlloyLedger, BatchCallSubmitter, ContractHandle, ExternalAsset,
    DEFAULT_BATCH_METHOD,
};
use serde_json::{json, Value};
use tracing::info;
use wiremock::{matchers::method, Mock, MockServer, Request, Respond, ResponseTemplate};

const GWEI: &str = "0x3b9aca00";

/// Node state: transactions are mined on arrival when their nonce is the
/// next one, and stay queued otherwise.
#[derive(Default)]
struct NodeState {
    next_nonce: u64,
    estimates: usize,
    sent_nonces: Vec<u64>,
    sent: usize,
    mined: HashSet<String>,
}

/// JSON-RPC node whose `reject_estimate`-th gas estimation (1-based) reverts.
#[derive(Clone)]
struct StubNode {
    state: Arc<Mutex<NodeState>>,
    reject_estimate: usize,
}

impl StubNode {
    fn new(reject_estimate: usize) -> Self {
        Self { state: Arc::default(), reject_estimate }
    }

    fn sent_nonces(&self) -> Vec<u64> {
        self.state.lock().unwrap().sent_nonces.clone()
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value, Value> {
        let mut state = self.state.lock().unwrap();
        match method {
            "eth_chainId" => Ok(json!("0x7a69")),
            "eth_blockNumber" => Ok(json!("0x1")),
            "eth_gasPrice" | "eth_maxPriorityFeePerGas" => Ok(json!(GWEI)),
            "eth_feeHistory" => Ok(json!({
                "oldestBlock": "0x1",
                "baseFeePerGas": [GWEI, GWEI],
                "gasUsedRatio": [0.5],
                "reward": [[GWEI]]
            })),
            "eth_getTransactionCount" => Ok(json!(format!("{:#x}", state.next_nonce))),
            "eth_estimateGas" => {
                state.estimates += 1;
                if state.estimates == self.reject_estimate {
                    Err(json!({ "code": 3, "message": "execution reverted: Pokemon: empty name" }))
                } else {
                    Ok(json!("0x186a0"))
                }
            }
            "eth_sendTransaction" => {
                let nonce = params[0]["nonce"]
                    .as_str()
                    .and_then(|n| u64::from_str_radix(n.trim_start_matches("0x"), 16).ok())
                    .expect("nonce is filled");
                let hash = format!("0x{:064x}", 0x1000 + state.sent);
                state.sent += 1;
                state.sent_nonces.push(nonce);
                if nonce == state.next_nonce {
                    state.next_nonce += 1;
                    state.mined.insert(hash.clone());
                }
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                let hash = params[0].as_str().unwrap_or_default();
                if !state.mined.contains(hash) {
                    return Ok(Value::Null);
                }
                Ok(json!({
                    "transactionHash": hash,
                    "transactionIndex": "0x0",
                    "blockHash": format!("0x{:064x}", 0xb10c),
                    "blockNumber": "0x2",
                    "from": Address::repeat_byte(0x11).to_string(),
                    "to": Address::repeat_byte(0xcc).to_string(),
                    "contractAddress": null,
                    "cumulativeGasUsed": "0x186a0",
                    "gasUsed": "0x186a0",
                    "effectiveGasPrice": GWEI,
                    "logs": [],
                    "logsBloom": format!("0x{}", "00".repeat(256)),
                    "type": "0x2",
                    "status": "0x1"
                }))
            }
            other => Err(json!({ "code": -32601, "message": format!("method {other} not found") })),
        }
    }
}

impl Respond for StubNode {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("JSON-RPC request");
        let method = body["method"].as_str().unwrap_or_default();
        let response = match self.handle(method, &body["params"]) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": body["id"], "result": result }),
            Err(error) => json!({ "jsonrpc": "2.0", "id": body["id"], "error": error }),
        };
        ResponseTemplate::new(200).set_body_json(response)
    }
}

#[tokio::test]
async fn test_rejected_item_does_not_stall_later_items() {
    edp_common::logging::ensure_test_logging(None);
    info!("Testing batch submission over JSON-RPC with a rejected middle item");

    let node = StubNode::new(2);
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(node.clone()).mount(&server).await;

    let ledger = AlloyLedger::connect(&server.uri(), None)
        .unwrap()
        .with_poll_interval(Duration::from_millis(10));
    let submitter =
        BatchCallSubmitter::new(Arc::new(ledger), DEFAULT_BATCH_METHOD, Duration::from_secs(2));
    let contract = ContractHandle { address: Address::repeat_byte(0xcc), abi: pokemon_abi() };
    let assets: Vec<_> = ["pikachu", "", "eevee"]
        .iter()
        .map(|name| ExternalAsset::new(*name, format!("https://ipfs.io/ipfs/Qm{name}")))
        .collect();

    let results = submitter.submit(&contract, &assets, Address::repeat_byte(0x11)).await;

    assert_eq!(results.iter().map(|r| r.success).collect::<Vec<_>>(), [true, false, true]);
    assert!(results[1].error.as_deref().unwrap().contains("empty name"));
    assert!(results[2].error.is_none(), "{:?}", results[2].error);
    // The rejected item consumed no nonce
    assert_eq!(node.sent_nonces(), [0, 1]);
}
