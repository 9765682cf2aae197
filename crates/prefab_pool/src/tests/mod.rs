//! Cross-module scenarios: pools and the registry driven through a scene
