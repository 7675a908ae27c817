//! Elastic Load Balancing v2 client.

use async_trait::async_trait;
use aws_sdk_elasticloadbalancingv2 as elb;
use aws_sdk_elasticloadbalancingv2::error::DisplayErrorContext;
use tracing::debug;

use crate::error::ResolutionError;
use crate::resolver::LoadBalancerApi;

/// [`LoadBalancerApi`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct ElbClient {
    client: elb::Client,
}

impl ElbClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: elb::Client::new(config),
        }
    }
}

#[async_trait]
impl LoadBalancerApi for ElbClient {
    async fn find_arn(&self, name: &str) -> Result<Option<String>, ResolutionError> {
        let out = match self.client.describe_load_balancers().names(name).send().await {
            Ok(out) => out,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_load_balancer_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(ResolutionError::Api(DisplayErrorContext(&e).to_string())),
        };

        let arn = out
            .load_balancers()
            .iter()
            .find(|lb| lb.load_balancer_name() == Some(name))
            .and_then(|lb| lb.load_balancer_arn())
            .map(str::to_string);
        debug!("Load balancer {} has ARN {:?}", name, arn);
        Ok(arn)
    }

    async fn attributes(&self, arn: &str) -> Result<Vec<(String, String)>, ResolutionError> {
        let out = self
            .client
            .describe_load_balancer_attributes()
            .load_balancer_arn(arn)
            .send()
            .await
            .map_err(|e| ResolutionError::Api(DisplayErrorContext(&e).to_string()))?;

        Ok(out
            .attributes()
            .iter()
            .filter_map(|a| Some((a.key()?.to_string(), a.value()?.to_string())))
            .collect())
    }
}
