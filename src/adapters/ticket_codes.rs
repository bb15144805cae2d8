use {
    crate::domain::{
        BoxFuture,
        error::BookingError,
        issuance::{TicketCodePayload, TicketCodeRequest, TicketCodeStore},
    },
    hmac::{Hmac, Mac},
    serde::{Deserialize, Serialize},
    sha2::Sha256,
    std::path::PathBuf,
};

type HmacSha256 = Hmac<Sha256>;

/// What a gate scanner reads: the payload plus its hex HMAC-SHA256.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTicketCode {
    pub payload: TicketCodePayload,
    pub signature: String,
}

fn mac(secret: &[u8], payload: &TicketCodePayload) -> Result<HmacSha256, BookingError> {
    let bytes = serde_json::to_vec(payload)?;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| BookingError::Issuance(format!("invalid signing key: {e}")))?;
    mac.update(&bytes);
    Ok(mac)
}

pub fn sign(secret: &[u8], payload: TicketCodePayload) -> Result<SignedTicketCode, BookingError> {
    let signature = hex::encode(mac(secret, &payload)?.finalize().into_bytes());
    Ok(SignedTicketCode { payload, signature })
}

/// Constant-time check of a scanned code against the signing secret.
pub fn verify(secret: &[u8], code: &SignedTicketCode) -> bool {
    let Ok(expected) = hex::decode(&code.signature) else {
        return false;
    };
    mac(secret, &code.payload).is_ok_and(|m| m.verify_slice(&expected).is_ok())
}

/// Writes each signed code to `{dir}/{ticket_number}.json`.
pub struct FsTicketCodeStore {
    dir: PathBuf,
    base_url: String,
    secret: Vec<u8>,
}

impl FsTicketCodeStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>, secret: &[u8]) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into(),
            secret: secret.to_vec(),
        }
    }

    async fn write(&self, request: &TicketCodeRequest) -> Result<String, BookingError> {
        let signed = sign(&self.secret, request.payload.clone())?;
        let body = serde_json::to_vec_pretty(&signed)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BookingError::Issuance(format!("create {}: {e}", self.dir.display())))?;

        let storage_ref = format!("{}.json", request.payload.ticket_number);
        let path = self.dir.join(&storage_ref);
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| BookingError::Issuance(format!("write {}: {e}", path.display())))?;

        tracing::debug!(ticket_number = %request.payload.ticket_number, path = %path.display(), "ticket code stored");
        Ok(storage_ref)
    }
}

impl TicketCodeStore for FsTicketCodeStore {
    fn generate_and_store<'a>(
        &'a self,
        request: &'a TicketCodeRequest,
    ) -> BoxFuture<'a, Result<String, BookingError>> {
        Box::pin(self.write(request))
    }

    fn display_url(&self, storage_ref: &str) -> String {
        format!("{}/{storage_ref}", self.base_url.trim_end_matches('/'))
    }
}
