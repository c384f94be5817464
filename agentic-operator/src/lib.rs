//! Agentic Kubernetes Operator
//!
//! This crate provides a Kubernetes operator for deploying and managing
//! long-running AI agent workloads declared through the `Agent` custom
//! resource.
//!
//! # Custom Resource Definition
//!
//! - **Agent**: Describes an AI agent (provider, model, credentials, tools,
//!   optional workflow graph) that the operator materializes as a Deployment,
//!   Service, ConfigMap and, conditionally, a HorizontalPodAutoscaler and an
//!   Ingress.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: agentic.ai/v1
//! kind: Agent
//! metadata:
//!   name: support-bot
//! spec:
//!   provider: openai
//!   model: gpt-4
//!   systemPrompt: "You are a helpful support agent."
//!   apiSecretRef:
//!     name: openai-credentials
//!     key: api-key
//!   replicas: 2
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod admission;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod health;
pub mod leader;
pub mod resources;
pub mod status;

pub use crd::{Agent, AgentSpec, AgentStatus};
pub use error::{OperatorError, OperatorResult};
