mod adapter_tests;
mod subscription_tests;
