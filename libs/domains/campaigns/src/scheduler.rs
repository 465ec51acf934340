use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, instrument, warn};

use crate::error::{CampaignError, CampaignResult};
use crate::models::Campaign;
use crate::repository::CampaignRepository;
use crate::sender::CampaignSender;

/// Sweep for due campaigns once a minute, on the minute
const SWEEP_SCHEDULE: &str = "0 * * * * *";

/// Background dispatcher for scheduled campaigns
///
/// Each sweep picks up campaigns whose `scheduled_at` has passed and
/// starts a send pass for them, one spawned task per campaign.
pub struct CampaignScheduler<R> {
    repository: Arc<R>,
    sender: Arc<CampaignSender<R>>,
}

impl<R: CampaignRepository + 'static> CampaignScheduler<R> {
    pub fn new(repository: Arc<R>, sender: Arc<CampaignSender<R>>) -> Self {
        Self { repository, sender }
    }

    /// One sweep over due scheduled campaigns; returns how many were
    /// dispatched
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> CampaignResult<usize> {
        let due = self.repository.due_scheduled(Utc::now()).await?;
        let mut started = 0;

        for campaign in due {
            let campaign_id = campaign.id;
            match self.dispatch(campaign).await {
                Ok(true) => started += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        campaign_id = %campaign_id,
                        error = %e,
                        "Failed to dispatch scheduled campaign"
                    );
                }
            }
        }

        Ok(started)
    }

    async fn dispatch(&self, campaign: Campaign) -> CampaignResult<bool> {
        if campaign.total_recipients == 0 {
            warn!(
                campaign_id = %campaign.id,
                "Scheduled campaign has no recipients, marking failed"
            );
            self.repository.mark_failed(campaign.id).await?;
            return Ok(false);
        }

        // A manual send or a second scheduler instance may have won.
        if !self.repository.begin_sending(campaign.id).await? {
            return Ok(false);
        }

        info!(
            campaign_id = %campaign.id,
            name = %campaign.name,
            "Starting scheduled campaign"
        );
        self.sender.clone().spawn(campaign.id, false, None);
        Ok(true)
    }

    /// Install the minutely sweep on a fresh scheduler and start it
    ///
    /// The returned handle keeps the jobs alive; drop it to stop
    /// sweeping.
    pub async fn start(self) -> CampaignResult<JobScheduler> {
        let sched = JobScheduler::new()
            .await
            .map_err(|e| CampaignError::Internal(e.to_string()))?;
        let scheduler = Arc::new(self);

        let job = Job::new_async(SWEEP_SCHEDULE, move |_uuid, _l| {
            let scheduler = scheduler.clone();
            Box::pin(async move {
                match scheduler.run_once().await {
                    Ok(0) => {}
                    Ok(started) => {
                        info!(started, "Scheduled campaigns dispatched");
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduled campaign sweep failed");
                    }
                }
            })
        })
        .map_err(|e| CampaignError::Internal(e.to_string()))?;

        sched
            .add(job)
            .await
            .map_err(|e| CampaignError::Internal(e.to_string()))?;
        sched
            .start()
            .await
            .map_err(|e| CampaignError::Internal(e.to_string()))?;

        info!(schedule = SWEEP_SCHEDULE, "Campaign scheduler started");
        Ok(sched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignStatus, CreateCampaign, CreateRecipient};
    use crate::repository::InMemoryCampaignRepository;
    use crate::tracking::LinkTracker;
    use email::MockProvider;
    use uuid::Uuid;

    fn scheduler_with(
        repository: Arc<InMemoryCampaignRepository>,
    ) -> CampaignScheduler<InMemoryCampaignRepository> {
        let sender = Arc::new(CampaignSender::new(
            repository.clone(),
            Arc::new(MockProvider::new()),
            LinkTracker::new("https://api.test", "secret"),
            "https://app.test",
            3,
        ));
        CampaignScheduler::new(repository, sender)
    }

    async fn seed_scheduled(
        repository: &InMemoryCampaignRepository,
        scheduled_at: chrono::DateTime<Utc>,
        with_recipient: bool,
    ) -> Uuid {
        let campaign = repository
            .create_campaign(CreateCampaign {
                name: "Digest".to_string(),
                subject: "This week".to_string(),
                from_name: "Acme".to_string(),
                from_email: "news@acme.io".to_string(),
                reply_to: None,
                html_content: "<p>Hi {{firstname}}</p>".to_string(),
                batch_size: 10,
                rate_limit_per_second: 100,
            })
            .await
            .unwrap();

        if with_recipient {
            repository
                .add_recipient(
                    campaign.id,
                    CreateRecipient {
                        email: "a@example.com".to_string(),
                        first_name: None,
                        last_name: None,
                        company: None,
                        custom_data: serde_json::json!({}),
                    },
                )
                .await
                .unwrap();
        }

        assert!(repository
            .schedule_campaign(campaign.id, scheduled_at)
            .await
            .unwrap());
        campaign.id
    }

    async fn wait_for_status(
        repository: &InMemoryCampaignRepository,
        id: Uuid,
        status: CampaignStatus,
    ) {
        for _ in 0..200 {
            if repository.get_campaign(id).await.unwrap().unwrap().status == status {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("campaign never reached {}", status);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_dispatches_due_campaigns() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let scheduler = scheduler_with(repository.clone());

        let due = seed_scheduled(&repository, Utc::now() - chrono::Duration::minutes(5), true).await;
        let future =
            seed_scheduled(&repository, Utc::now() + chrono::Duration::hours(1), true).await;

        assert_eq!(scheduler.run_once().await.unwrap(), 1);

        wait_for_status(&repository, due, CampaignStatus::Completed).await;
        let finished = repository.get_campaign(due).await.unwrap().unwrap();
        assert_eq!(finished.sent_count, 1);

        let untouched = repository.get_campaign(future).await.unwrap().unwrap();
        assert_eq!(untouched.status, CampaignStatus::Scheduled);
    }

    #[tokio::test]
    async fn sweep_fails_due_campaign_without_recipients() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let scheduler = scheduler_with(repository.clone());

        let empty =
            seed_scheduled(&repository, Utc::now() - chrono::Duration::minutes(5), false).await;

        assert_eq!(scheduler.run_once().await.unwrap(), 0);

        let failed = repository.get_campaign(empty).await.unwrap().unwrap();
        assert_eq!(failed.status, CampaignStatus::Failed);
    }

    #[tokio::test]
    async fn sweep_skips_campaigns_already_taken() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let scheduler = scheduler_with(repository.clone());

        let due = seed_scheduled(&repository, Utc::now() - chrono::Duration::minutes(5), true).await;
        // Taken by a manual send before the sweep runs.
        assert!(repository.begin_sending(due).await.unwrap());

        assert_eq!(scheduler.run_once().await.unwrap(), 0);
    }
}
