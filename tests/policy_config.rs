use instance_guard::{Instance, Policy};

#[derive(serde::Deserialize)]
struct Settings {
   policy: Policy,
   #[serde(default)]
   fallback: Policy,
}

#[test]
fn test_policy_from_config() {
   let settings: Settings = serde_json::from_str(r#"{ "policy": "eager" }"#).unwrap();
   assert_eq!(settings.policy, Policy::Eager);
   // Missing keys fall back to lazy construction.
   assert_eq!(settings.fallback, Policy::Lazy);

   let instance = Instance::new(settings.policy, || 8u16);
   assert!(instance.is_ready());
}

#[test]
fn test_policy_serializes_lowercase() {
   assert_eq!(serde_json::to_string(&Policy::Lazy).unwrap(), r#""lazy""#);
   assert_eq!(serde_json::to_string(&Policy::Eager).unwrap(), r#""eager""#);
   // Unlike FromStr, the serde form is exact.
   assert!(serde_json::from_str::<Policy>(r#""Eager""#).is_err());
}
