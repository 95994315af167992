mod fetcher;

pub use fetcher::SchemaFetcher;

use std::collections::BTreeMap;

use ethers::types::transaction::eip712::{EIP712Domain, TypedData, Types};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::prelude::Result;
use crate::{Error, InputPayload};

/// Type name EIP-712 reserves for the domain. Schemas may list it in
/// `types`; it is never a valid primary type for an action.
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// Everything a wallet needs, besides the message itself, to produce a
/// typed-data signature for one action.
///
/// A schema is only ever built through [`SigningSchema::new`] (or the
/// fetcher), so a value of this type is always closed: the primary type
/// exists and every referenced field type resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningSchema {
    domain: EIP712Domain,
    types: Types,
    primary_type: String,
}

/// Body of `GET /getEIP712Types/{action}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaResponse {
    pub eip712_types: Option<Types>,
    pub domain: Option<EIP712Domain>,
    pub primary_type: Option<String>,
}

impl SigningSchema {
    pub fn new(domain: EIP712Domain, types: Types, primary_type: impl Into<String>) -> Result<Self> {
        let schema = SigningSchema {
            domain,
            types,
            primary_type: primary_type.into(),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn domain(&self) -> &EIP712Domain {
        &self.domain
    }

    pub fn types(&self) -> &Types {
        &self.types
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    /// The typed-data document for `payload`. Domain, types and primary type
    /// are copied as fetched; only the message comes from the caller.
    ///
    /// Fields the schema does not declare would be left out of the hash yet
    /// still be submitted, so any such field, at any nesting depth, is a
    /// [`Error::SignerError`].
    pub fn typed_data(&self, payload: &InputPayload) -> Result<TypedData> {
        self.check_struct(&self.primary_type, payload, &self.primary_type)?;
        Ok(TypedData {
            domain: self.domain.clone(),
            types: self.types.clone(),
            primary_type: self.primary_type.clone(),
            message: payload
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    fn check_struct(&self, type_name: &str, value: &Map<String, Value>, path: &str) -> Result<()> {
        let fields = self.types.get(type_name).map(Vec::as_slice).unwrap_or_default();
        for (key, member) in value {
            let field = fields.iter().find(|f| &f.name == key).ok_or_else(|| {
                Error::SignerError(format!("{path}.{key} is not a field of {type_name}"))
            })?;
            self.check_value(&field.r#type, member, &format!("{path}.{key}"))?;
        }
        Ok(())
    }

    /// Values of the wrong shape are left for the encoder to reject.
    fn check_value(&self, ty: &str, value: &Value, path: &str) -> Result<()> {
        if let Some(element_ty) = ty
            .strip_suffix(']')
            .and_then(|inner| inner.rfind('[').map(|open| &inner[..open]))
        {
            if let Value::Array(items) = value {
                for (i, item) in items.iter().enumerate() {
                    self.check_value(element_ty, item, &format!("{path}[{i}]"))?;
                }
            }
            return Ok(());
        }
        match value {
            Value::Object(map) if self.types.contains_key(ty) => self.check_struct(ty, map, path),
            _ => Ok(()),
        }
    }

    fn validate(&self) -> Result<()> {
        let domain = &self.domain;
        if domain.name.is_none()
            && domain.version.is_none()
            && domain.chain_id.is_none()
            && domain.verifying_contract.is_none()
            && domain.salt.is_none()
        {
            return Err(Error::MalformedSchema("domain has no fields".to_string()));
        }

        if self.primary_type.is_empty() || self.primary_type == EIP712_DOMAIN_TYPE {
            return Err(Error::MalformedSchema(format!(
                "invalid primary type {:?}",
                self.primary_type
            )));
        }
        if !self.types.contains_key(&self.primary_type) {
            return Err(Error::MalformedSchema(format!(
                "primary type {:?} is not defined in types",
                self.primary_type
            )));
        }

        for (type_name, fields) in &self.types {
            for field in fields {
                let base = strip_array_suffixes(&field.r#type).ok_or_else(|| {
                    Error::MalformedSchema(format!(
                        "{type_name}.{}: malformed array type {:?}",
                        field.name, field.r#type
                    ))
                })?;
                if !is_primitive(base) && !self.types.contains_key(base) {
                    return Err(Error::MalformedSchema(format!(
                        "{type_name}.{}: unknown type {:?}",
                        field.name, field.r#type
                    )));
                }
            }
        }

        Ok(())
    }
}

impl SchemaResponse {
    /// Checks the response shape and resolves the primary type: one named by
    /// the server wins over `fallback_primary_type`.
    pub(crate) fn into_schema(self, fallback_primary_type: String) -> Result<SigningSchema> {
        let types = self
            .eip712_types
            .ok_or_else(|| Error::MalformedSchema("missing eip712Types".to_string()))?;
        let domain = self
            .domain
            .ok_or_else(|| Error::MalformedSchema("missing domain".to_string()))?;
        let primary_type = self.primary_type.unwrap_or(fallback_primary_type);
        SigningSchema::new(domain, types, primary_type)
    }
}

/// `Foo[2][]` -> `Foo`. Returns `None` for unbalanced brackets or a
/// non-numeric fixed length.
fn strip_array_suffixes(ty: &str) -> Option<&str> {
    let mut ty = ty;
    while let Some(inner) = ty.strip_suffix(']') {
        let open = inner.rfind('[')?;
        let len = &inner[open + 1..];
        if !len.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        ty = &inner[..open];
    }
    if ty.is_empty() || ty.contains('[') {
        return None;
    }
    Some(ty)
}

fn is_primitive(ty: &str) -> bool {
    match ty {
        "address" | "bool" | "string" | "bytes" => true,
        _ => {
            if let Some(n) = ty.strip_prefix("bytes") {
                return matches!(n.parse::<u8>(), Ok(1..=32));
            }
            let bits = ty.strip_prefix("uint").or_else(|| ty.strip_prefix("int"));
            match bits.map(str::parse::<u16>) {
                Some(Ok(bits)) => bits % 8 == 0 && (8..=256).contains(&bits),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ethers::types::transaction::eip712::Eip712DomainType;
    use ethers::types::{Address, U256};
    use serde_json::json;

    pub(crate) fn sample_domain() -> EIP712Domain {
        EIP712Domain {
            name: Some("App".to_string()),
            version: Some("1".to_string()),
            chain_id: Some(U256::from(11155111u64)),
            verifying_contract: Some(
                "0x0000000000000000000000000000000000000001"
                    .parse::<Address>()
                    .unwrap(),
            ),
            salt: None,
        }
    }

    pub(crate) fn field(name: &str, ty: &str) -> Eip712DomainType {
        Eip712DomainType {
            name: name.to_string(),
            r#type: ty.to_string(),
        }
    }

    pub(crate) fn sample_schema() -> SigningSchema {
        let mut types = Types::new();
        types.insert("createAccount".to_string(), vec![field("address", "address")]);
        SigningSchema::new(sample_domain(), types, "createAccount").unwrap()
    }

    #[test]
    fn test_primitive_types() {
        for ty in ["address", "bool", "string", "bytes", "bytes1", "bytes32", "uint8", "uint256", "int64"] {
            assert!(is_primitive(ty), "{ty} should be primitive");
        }
        for ty in ["bytes0", "bytes33", "uint7", "uint264", "int", "uint", "Person", "address2"] {
            assert!(!is_primitive(ty), "{ty} should not be primitive");
        }
    }

    #[test]
    fn test_strip_array_suffixes() {
        assert_eq!(strip_array_suffixes("uint256"), Some("uint256"));
        assert_eq!(strip_array_suffixes("Person[]"), Some("Person"));
        assert_eq!(strip_array_suffixes("address[3][]"), Some("address"));
        assert_eq!(strip_array_suffixes("Person[x]"), None);
        assert_eq!(strip_array_suffixes("[]"), None);
        assert_eq!(strip_array_suffixes("Person]"), None);
    }

    #[test]
    fn test_nested_struct_schema_is_closed() {
        let mut types = Types::new();
        types.insert(
            "Mail".to_string(),
            vec![field("from", "Person"), field("to", "Person[]"), field("contents", "string")],
        );
        types.insert(
            "Person".to_string(),
            vec![field("name", "string"), field("wallet", "address")],
        );
        assert!(SigningSchema::new(sample_domain(), types, "Mail").is_ok());
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let mut types = Types::new();
        types.insert("Mail".to_string(), vec![field("from", "Person")]);
        let err = SigningSchema::new(sample_domain(), types, "Mail").unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(msg) if msg.contains("Person")));
    }

    #[test]
    fn test_primary_type_must_exist() {
        let mut types = Types::new();
        types.insert("createAccount".to_string(), vec![field("address", "address")]);
        let err = SigningSchema::new(sample_domain(), types.clone(), "deleteAccount").unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));

        let err = SigningSchema::new(sample_domain(), types, EIP712_DOMAIN_TYPE).unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));
    }

    #[test]
    fn test_empty_domain_is_rejected() {
        let mut types = Types::new();
        types.insert("createAccount".to_string(), vec![field("address", "address")]);
        let err = SigningSchema::new(EIP712Domain::default(), types, "createAccount").unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));
    }

    #[test]
    fn test_response_primary_type_resolution() {
        let body = json!({
            "eip712Types": { "createAccount": [{ "name": "address", "type": "address" }] },
            "domain": {
                "name": "App",
                "version": "1",
                "chainId": 11155111,
                "verifyingContract": "0x0000000000000000000000000000000000000001"
            }
        });
        let response: SchemaResponse = serde_json::from_value(body.clone()).unwrap();
        let schema = response.into_schema("createAccount".to_string()).unwrap();
        assert_eq!(schema, sample_schema());

        let mut with_primary = body;
        with_primary["eip712Types"]["Register"] = json!([{ "name": "who", "type": "address" }]);
        with_primary["primaryType"] = json!("Register");
        let response: SchemaResponse = serde_json::from_value(with_primary).unwrap();
        let schema = response.into_schema("createAccount".to_string()).unwrap();
        assert_eq!(schema.primary_type(), "Register");
    }

    #[test]
    fn test_typed_data_passes_schema_through() {
        let schema = sample_schema();
        let mut payload = InputPayload::new();
        payload.insert(
            "address".to_string(),
            json!("0x00000000000000000000000000000000000000ab"),
        );

        let typed = schema.typed_data(&payload).unwrap();
        assert_eq!(&typed.domain, schema.domain());
        assert_eq!(&typed.types, schema.types());
        assert_eq!(typed.primary_type, "createAccount");
        assert_eq!(typed.message.len(), 1);
        assert_eq!(typed.message["address"], payload["address"]);
    }

    fn mail_schema() -> SigningSchema {
        let mut types = Types::new();
        types.insert(
            "Mail".to_string(),
            vec![field("from", "Person"), field("to", "Person[]"), field("contents", "string")],
        );
        types.insert(
            "Person".to_string(),
            vec![field("name", "string"), field("wallet", "address")],
        );
        SigningSchema::new(sample_domain(), types, "Mail").unwrap()
    }

    fn payload(value: serde_json::Value) -> InputPayload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("Expected an object, got {other}"),
        }
    }

    #[test]
    fn test_undeclared_field_is_rejected() {
        let err = sample_schema()
            .typed_data(&payload(json!({
                "address": "0x00000000000000000000000000000000000000ab",
                "amount": 1000000
            })))
            .unwrap_err();
        assert!(matches!(err, Error::SignerError(msg) if msg.contains("amount")));
    }

    #[test]
    fn test_undeclared_nested_field_is_rejected() {
        let person = json!({ "name": "Bob", "wallet": "0x00000000000000000000000000000000000000ab" });
        let schema = mail_schema();
        assert!(schema
            .typed_data(&payload(json!({ "from": person, "to": [person], "contents": "hi" })))
            .is_ok());

        let mut sneaky = person.clone();
        sneaky["admin"] = json!(true);
        let err = schema
            .typed_data(&payload(json!({ "from": sneaky, "to": [person], "contents": "hi" })))
            .unwrap_err();
        assert!(matches!(err, Error::SignerError(msg) if msg.contains("Mail.from.admin")));

        let err = schema
            .typed_data(&payload(json!({ "from": person, "to": [person, sneaky], "contents": "hi" })))
            .unwrap_err();
        assert!(matches!(err, Error::SignerError(msg) if msg.contains("Mail.to[1].admin")));
    }
}
