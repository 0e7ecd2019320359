//! Outbound proof requests.

use chrono::Utc;
use std::collections::BTreeSet;

use vouch_core::{ConnectionId, ProofRequestSpec, ProofResultRecord, VerificationStatus};
use vouch_engine::{compile_definition, identity_request};

use crate::engine::DecisionEngine;
use crate::error::DecisionError;

impl DecisionEngine {
    /// Compile the current definition and send every request to `connection`.
    ///
    /// Each requested descriptor is reset to pending in the contact's record
    /// before anything is sent. A definition fetch failure aborts before any
    /// state is written. Returns the agent exchange ids of the requests that
    /// were accepted.
    pub async fn request_presentations(
        &self,
        connection: &ConnectionId,
    ) -> Result<Vec<String>, DecisionError> {
        let definition = self.definitions.fetch().await?;
        let contact = self.contact(connection).await?;
        let specs = compile_definition(&definition, connection, Utc::now().timestamp());

        {
            let _guard = self.locks.lock(&contact).await;
            let mut record = self
                .store
                .load_results(&contact)
                .await?
                .unwrap_or_else(|| ProofResultRecord::new(definition.id.clone()));
            record.align_definition(definition.id.as_deref());

            let requested: BTreeSet<&str> =
                specs.iter().map(|s| s.descriptor_name.as_str()).collect();
            for name in &requested {
                record.mark_requested(name);
            }
            record.status = VerificationStatus::Pending;
            self.store.save_results(&contact, &record).await?;
        }

        tracing::info!(
            contact = %contact,
            connection = %connection,
            requests = specs.len(),
            "requesting presentations"
        );
        Ok(self.send_all(&specs).await)
    }

    /// Ask the holder for self-attested demographics and passport data.
    pub async fn request_identity(&self, connection: &ConnectionId) -> Option<String> {
        self.send_all(&[identity_request(connection)]).await.pop()
    }

    async fn send_all(&self, specs: &[ProofRequestSpec]) -> Vec<String> {
        let mut exchanges = Vec::with_capacity(specs.len());
        for spec in specs {
            let request = spec.to_send_request(rand::random::<u64>());
            match self.agent.request_proof(request).await {
                Ok(exchange_id) => {
                    tracing::debug!(descriptor = %spec.descriptor_name, exchange = %exchange_id, "proof request sent");
                    exchanges.push(exchange_id);
                }
                Err(e) => {
                    tracing::error!(descriptor = %spec.descriptor_name, error = %e, "proof request failed")
                }
            }
        }
        exchanges
    }
}
