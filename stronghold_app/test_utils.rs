#[cfg(any(test, feature = "test-utils"))]
#[cfg(not(tarpaulin_include))]
pub mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };
    use tokio::sync::OwnedMutexGuard;
    use uuid::Uuid;

    use stronghold_game::{
        models::{
            battle::{Battle, BattleResolution},
            building::Building,
            construction::{ConstructionStatus, ConstructionTask},
            movement::ArmyMovement,
            training::{TrainingStatus, TrainingTask},
            troops::TroopGroup,
            village::Village,
        },
        test_utils::{TrainingTaskFactoryOptions, VillageFactoryOptions, training_task_factory, village_factory},
    };
    use stronghold_types::{
        buildings::BuildingName,
        common::{ResourceGroup, ResourceKind},
        errors::{ApplicationError, DbError, GameError},
        map::Position,
        troops::{TroopAmount, TroopName, TroopStatus},
    };

    use crate::{
        events::EventBuffer,
        jobs::{Job, JobKey, JobStatus, RetentionPolicy},
        repository::{
            BattleRepository, BuildingRepository, ConstructionTaskRepository, JobRepository,
            MovementRepository, TrainingTaskRepository, TroopRepository, VillageRepository,
        },
        uow::{UnitOfWork, UnitOfWorkProvider},
    };

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct MockClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        }
    }

    impl MockClock {
        pub fn at(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap() = now;
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    /// Whole content of the in-memory store.
    #[derive(Debug, Default, Clone)]
    pub struct StoreState {
        villages: HashMap<Uuid, Village>,
        buildings: HashMap<Uuid, Building>,
        construction_tasks: HashMap<Uuid, ConstructionTask>,
        troops: HashMap<(Uuid, TroopName, TroopStatus), u32>,
        // Kept in insertion order so FIFO ties on created_at are stable.
        training_tasks: Vec<TrainingTask>,
        battles: HashMap<Uuid, Battle>,
        movements: HashMap<Uuid, ArmyMovement>,
        jobs: HashMap<Uuid, Job>,
    }

    type Shared = Arc<Mutex<StoreState>>;

    #[derive(Clone)]
    pub struct InMemoryVillageRepository {
        state: Shared,
    }

    #[async_trait]
    impl VillageRepository for InMemoryVillageRepository {
        async fn create(&self, village: &Village) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            if state.villages.values().any(|v| v.position == village.position) {
                return Err(ApplicationError::Game(GameError::PositionOccupied(
                    village.position,
                )));
            }
            state.villages.insert(village.id, village.clone());
            Ok(())
        }

        async fn get_by_id(&self, village_id: Uuid) -> Result<Village, ApplicationError> {
            let state = self.state.lock().unwrap();
            state
                .villages
                .get(&village_id)
                .cloned()
                .ok_or_else(|| ApplicationError::Db(DbError::VillageNotFound(village_id)))
        }

        async fn get_by_position(
            &self,
            position: &Position,
        ) -> Result<Option<Village>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .villages
                .values()
                .find(|v| v.position == *position)
                .cloned())
        }

        async fn list_by_player_id(
            &self,
            player_id: Uuid,
        ) -> Result<Vec<Village>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut villages: Vec<Village> = state
                .villages
                .values()
                .filter(|v| v.player_id == player_id)
                .cloned()
                .collect();
            villages.sort_by_key(|v| v.created_at);
            Ok(villages)
        }

        async fn collect(
            &self,
            village_id: Uuid,
            at: DateTime<Utc>,
        ) -> Result<Village, ApplicationError> {
            self.update(village_id, |v| v.collect(at))
        }

        async fn try_deduct(
            &self,
            village_id: Uuid,
            cost: &ResourceGroup,
        ) -> Result<Option<Village>, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let village = state
                .villages
                .get_mut(&village_id)
                .ok_or_else(|| ApplicationError::Db(DbError::VillageNotFound(village_id)))?;
            Ok(village.deduct_resources(cost).ok().map(|_| village.clone()))
        }

        async fn add_resources(
            &self,
            village_id: Uuid,
            gain: &ResourceGroup,
        ) -> Result<Village, ApplicationError> {
            self.update(village_id, |v| v.store_resources(gain))
        }

        async fn increase_production(
            &self,
            village_id: Uuid,
            kind: ResourceKind,
            amount: u64,
        ) -> Result<(), ApplicationError> {
            self.update(village_id, |v| v.increase_production(kind, amount))?;
            Ok(())
        }
    }

    impl InMemoryVillageRepository {
        fn update(
            &self,
            village_id: Uuid,
            f: impl FnOnce(&mut Village),
        ) -> Result<Village, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let village = state
                .villages
                .get_mut(&village_id)
                .ok_or_else(|| ApplicationError::Db(DbError::VillageNotFound(village_id)))?;
            f(village);
            Ok(village.clone())
        }
    }

    #[derive(Clone)]
    pub struct InMemoryBuildingRepository {
        state: Shared,
    }

    #[async_trait]
    impl BuildingRepository for InMemoryBuildingRepository {
        async fn create_many(&self, buildings: &[Building]) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            for building in buildings {
                state.buildings.insert(building.id, building.clone());
            }
            Ok(())
        }

        async fn get_by_id(&self, building_id: Uuid) -> Result<Building, ApplicationError> {
            let state = self.state.lock().unwrap();
            state
                .buildings
                .get(&building_id)
                .cloned()
                .ok_or_else(|| ApplicationError::Db(DbError::BuildingNotFound(building_id)))
        }

        async fn get_by_name(
            &self,
            village_id: Uuid,
            name: BuildingName,
        ) -> Result<Option<Building>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .buildings
                .values()
                .find(|b| b.village_id == village_id && b.name == name)
                .cloned())
        }

        async fn list_by_village_id(
            &self,
            village_id: Uuid,
        ) -> Result<Vec<Building>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut buildings: Vec<Building> = state
                .buildings
                .values()
                .filter(|b| b.village_id == village_id)
                .cloned()
                .collect();
            buildings.sort_by_key(|b| b.name);
            Ok(buildings)
        }

        async fn mark_queued(
            &self,
            building_id: Uuid,
            until: DateTime<Utc>,
        ) -> Result<bool, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let building = state
                .buildings
                .get_mut(&building_id)
                .ok_or_else(|| ApplicationError::Db(DbError::BuildingNotFound(building_id)))?;
            Ok(building.start_upgrade(until).is_ok())
        }

        async fn complete_upgrade(
            &self,
            building_id: Uuid,
            target_level: u8,
        ) -> Result<Option<Building>, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let building = state
                .buildings
                .get_mut(&building_id)
                .ok_or_else(|| ApplicationError::Db(DbError::BuildingNotFound(building_id)))?;
            Ok(building
                .complete_upgrade(target_level)
                .then(|| building.clone()))
        }

        async fn cancel_upgrade(
            &self,
            building_id: Uuid,
            target_level: u8,
        ) -> Result<bool, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let building = state
                .buildings
                .get_mut(&building_id)
                .ok_or_else(|| ApplicationError::Db(DbError::BuildingNotFound(building_id)))?;
            Ok(building.cancel_upgrade(target_level))
        }
    }

    #[derive(Clone)]
    pub struct InMemoryConstructionTaskRepository {
        state: Shared,
    }

    impl InMemoryConstructionTaskRepository {
        fn in_progress_mut(
            state: &mut StoreState,
            building_id: Uuid,
            target_level: u8,
        ) -> Option<&mut ConstructionTask> {
            state.construction_tasks.values_mut().find(|t| {
                t.building_id == building_id
                    && t.target_level == target_level
                    && t.status == ConstructionStatus::InProgress
            })
        }
    }

    #[async_trait]
    impl ConstructionTaskRepository for InMemoryConstructionTaskRepository {
        async fn create(&self, task: &ConstructionTask) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            state.construction_tasks.insert(task.id, task.clone());
            Ok(())
        }

        async fn get_in_progress(
            &self,
            building_id: Uuid,
        ) -> Result<Option<ConstructionTask>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .construction_tasks
                .values()
                .find(|t| t.building_id == building_id && t.status == ConstructionStatus::InProgress)
                .cloned())
        }

        async fn list_in_progress_by_village_id(
            &self,
            village_id: Uuid,
        ) -> Result<Vec<ConstructionTask>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut tasks: Vec<ConstructionTask> = state
                .construction_tasks
                .values()
                .filter(|t| t.village_id == village_id && t.status == ConstructionStatus::InProgress)
                .cloned()
                .collect();
            tasks.sort_by_key(|t| t.end_time);
            Ok(tasks)
        }

        async fn complete(
            &self,
            building_id: Uuid,
            target_level: u8,
        ) -> Result<bool, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            Ok(Self::in_progress_mut(&mut state, building_id, target_level)
                .is_some_and(|t| t.complete()))
        }

        async fn cancel(
            &self,
            building_id: Uuid,
            target_level: u8,
        ) -> Result<Option<ConstructionTask>, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            Ok(Self::in_progress_mut(&mut state, building_id, target_level)
                .and_then(|t| t.cancel().then(|| t.clone())))
        }
    }

    #[derive(Clone)]
    pub struct InMemoryTroopRepository {
        state: Shared,
    }

    #[async_trait]
    impl TroopRepository for InMemoryTroopRepository {
        async fn list_by_village_id(
            &self,
            village_id: Uuid,
        ) -> Result<Vec<TroopGroup>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut groups: Vec<TroopGroup> = state
                .troops
                .iter()
                .filter(|((v, _, _), _)| *v == village_id)
                .map(|((village_id, troop, status), quantity)| TroopGroup {
                    village_id: *village_id,
                    troop: *troop,
                    status: *status,
                    quantity: *quantity,
                })
                .collect();
            groups.sort_by_key(|g| (g.troop, g.status.as_str()));
            Ok(groups)
        }

        async fn get_quantity(
            &self,
            village_id: Uuid,
            troop: TroopName,
            status: TroopStatus,
        ) -> Result<u32, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .troops
                .get(&(village_id, troop, status))
                .copied()
                .unwrap_or(0))
        }

        async fn increment(
            &self,
            village_id: Uuid,
            troop: TroopName,
            status: TroopStatus,
            quantity: u32,
        ) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            *state.troops.entry((village_id, troop, status)).or_insert(0) += quantity;
            Ok(())
        }

        async fn try_decrement(
            &self,
            village_id: Uuid,
            troop: TroopName,
            status: TroopStatus,
            quantity: u32,
        ) -> Result<bool, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            match state.troops.get_mut(&(village_id, troop, status)) {
                Some(current) if *current >= quantity => {
                    *current -= quantity;
                    Ok(true)
                }
                _ => Ok(quantity == 0),
            }
        }
    }

    #[derive(Clone)]
    pub struct InMemoryTrainingTaskRepository {
        state: Shared,
    }

    impl InMemoryTrainingTaskRepository {
        fn update<T>(
            &self,
            task_id: Uuid,
            f: impl FnOnce(&mut TrainingTask) -> Option<T>,
        ) -> Result<Option<T>, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let task = state
                .training_tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ApplicationError::Db(DbError::TrainingTaskNotFound(task_id)))?;
            Ok(f(task))
        }
    }

    #[async_trait]
    impl TrainingTaskRepository for InMemoryTrainingTaskRepository {
        async fn create(&self, task: &TrainingTask) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            state.training_tasks.push(task.clone());
            Ok(())
        }

        async fn get_by_id(&self, task_id: Uuid) -> Result<TrainingTask, ApplicationError> {
            let state = self.state.lock().unwrap();
            state
                .training_tasks
                .iter()
                .find(|t| t.id == task_id)
                .cloned()
                .ok_or_else(|| ApplicationError::Db(DbError::TrainingTaskNotFound(task_id)))
        }

        async fn find_in_progress(
            &self,
            village_id: Uuid,
            building: BuildingName,
        ) -> Result<Option<TrainingTask>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .training_tasks
                .iter()
                .find(|t| {
                    t.village_id == village_id
                        && t.building == building
                        && t.status == TrainingStatus::InProgress
                })
                .cloned())
        }

        async fn next_pending(
            &self,
            village_id: Uuid,
            building: BuildingName,
        ) -> Result<Option<TrainingTask>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .training_tasks
                .iter()
                .filter(|t| {
                    t.village_id == village_id
                        && t.building == building
                        && t.status == TrainingStatus::Pending
                })
                .min_by_key(|t| t.created_at)
                .cloned())
        }

        async fn list_unfinished_by_village_id(
            &self,
            village_id: Uuid,
        ) -> Result<Vec<TrainingTask>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut tasks: Vec<TrainingTask> = state
                .training_tasks
                .iter()
                .filter(|t| t.village_id == village_id && !t.status.is_finished())
                .cloned()
                .collect();
            tasks.sort_by_key(|t| t.created_at);
            Ok(tasks)
        }

        async fn start(
            &self,
            task_id: Uuid,
            at: DateTime<Utc>,
        ) -> Result<Option<TrainingTask>, ApplicationError> {
            self.update(task_id, |t| t.start(at).then(|| t.clone()))
        }

        async fn record_unit(
            &self,
            task_id: Uuid,
            expected_remaining: u32,
        ) -> Result<Option<TrainingTask>, ApplicationError> {
            self.update(task_id, |t| t.record_unit(expected_remaining).then(|| t.clone()))
        }

        async fn force_complete(&self, task_id: Uuid) -> Result<Option<u32>, ApplicationError> {
            self.update(task_id, |t| t.force_complete())
        }

        async fn cancel(&self, task_id: Uuid) -> Result<Option<TrainingTask>, ApplicationError> {
            self.update(task_id, |t| {
                let previous = t.clone();
                t.cancel().ok().map(|_| previous)
            })
        }
    }

    #[derive(Clone)]
    pub struct InMemoryBattleRepository {
        state: Shared,
    }

    #[async_trait]
    impl BattleRepository for InMemoryBattleRepository {
        async fn create(&self, battle: &Battle) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            state.battles.insert(battle.id, battle.clone());
            Ok(())
        }

        async fn get_by_id(&self, battle_id: Uuid) -> Result<Battle, ApplicationError> {
            let state = self.state.lock().unwrap();
            state
                .battles
                .get(&battle_id)
                .cloned()
                .ok_or_else(|| ApplicationError::Db(DbError::BattleNotFound(battle_id)))
        }

        async fn resolve(
            &self,
            battle_id: Uuid,
            at: DateTime<Utc>,
        ) -> Result<Option<Battle>, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let battle = state
                .battles
                .get_mut(&battle_id)
                .ok_or_else(|| ApplicationError::Db(DbError::BattleNotFound(battle_id)))?;
            Ok((battle.resolve(at) == BattleResolution::Resolved).then(|| battle.clone()))
        }

        async fn list_due_for_village(
            &self,
            village_id: Uuid,
            now: DateTime<Utc>,
        ) -> Result<Vec<Battle>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut battles: Vec<Battle> = state
                .battles
                .values()
                .filter(|b| {
                    (b.attacker_village_id == village_id || b.defender_village_id == village_id)
                        && b.is_due(now)
                })
                .cloned()
                .collect();
            battles.sort_by_key(|b| b.arrival_time);
            Ok(battles)
        }
    }

    #[derive(Clone)]
    pub struct InMemoryMovementRepository {
        state: Shared,
    }

    #[async_trait]
    impl MovementRepository for InMemoryMovementRepository {
        async fn create(&self, movement: &ArmyMovement) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            state.movements.insert(movement.id, movement.clone());
            Ok(())
        }

        async fn list_active_by_village_id(
            &self,
            village_id: Uuid,
        ) -> Result<Vec<ArmyMovement>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut movements: Vec<ArmyMovement> = state
                .movements
                .values()
                .filter(|m| m.village_id == village_id && !m.arrived)
                .cloned()
                .collect();
            movements.sort_by_key(|m| m.arrival_time);
            Ok(movements)
        }

        async fn mark_arrived_for_battle(&self, battle_id: Uuid) -> Result<u64, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let mut updated = 0;
            for movement in state
                .movements
                .values_mut()
                .filter(|m| m.battle_id == battle_id && !m.arrived)
            {
                movement.arrived = true;
                updated += 1;
            }
            Ok(updated)
        }
    }

    #[derive(Clone)]
    pub struct InMemoryJobRepository {
        state: Shared,
    }

    impl InMemoryJobRepository {
        /// Applies `f` only if the job is still processing under the given claim.
        fn update_claimed(
            &self,
            job_id: Uuid,
            claimed_attempts: u32,
            f: impl FnOnce(&mut Job),
        ) -> Result<bool, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| ApplicationError::Db(DbError::JobNotFound(job_id)))?;
            if job.status != JobStatus::Processing || job.attempts != claimed_attempts {
                return Ok(false);
            }
            f(job);
            Ok(true)
        }

        fn prune_status(
            state: &mut StoreState,
            status: JobStatus,
            policy: &RetentionPolicy,
            now: DateTime<Utc>,
        ) -> u64 {
            let cutoff = now - Duration::seconds(policy.max_age_secs);
            let mut finished: Vec<(Uuid, DateTime<Utc>)> = state
                .jobs
                .values()
                .filter(|j| j.status == status)
                .map(|j| (j.id, j.finished_at.unwrap_or(j.updated_at)))
                .collect();
            finished.sort_by(|a, b| b.1.cmp(&a.1));

            let keep = policy.max_count.max(0) as usize;
            let mut pruned = 0;
            for (index, (id, finished_at)) in finished.into_iter().enumerate() {
                if index >= keep || finished_at < cutoff {
                    state.jobs.remove(&id);
                    pruned += 1;
                }
            }
            pruned
        }
    }

    #[async_trait]
    impl JobRepository for InMemoryJobRepository {
        async fn add(&self, job: &Job) -> Result<Job, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            if let Some(existing) = state
                .jobs
                .values()
                .find(|j| j.key == job.key && j.status.is_active())
            {
                return Ok(existing.clone());
            }
            state.jobs.insert(job.id, job.clone());
            Ok(job.clone())
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Job, ApplicationError> {
            let state = self.state.lock().unwrap();
            state
                .jobs
                .get(&id)
                .cloned()
                .ok_or_else(|| ApplicationError::Db(DbError::JobNotFound(id)))
        }

        async fn get_latest_by_key(&self, key: &JobKey) -> Result<Option<Job>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .jobs
                .values()
                .filter(|j| j.key == *key)
                .max_by_key(|j| (j.status.is_active(), j.created_at))
                .cloned())
        }

        async fn list_by_village_id(&self, village_id: Uuid) -> Result<Vec<Job>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut jobs: Vec<Job> = state
                .jobs
                .values()
                .filter(|j| j.village_id == village_id)
                .cloned()
                .collect();
            jobs.sort_by_key(|j| j.run_at);
            Ok(jobs)
        }

        async fn remove_pending(&self, key: &JobKey) -> Result<bool, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let pending: Vec<Uuid> = state
                .jobs
                .values()
                .filter(|j| j.key == *key && j.status == JobStatus::Pending)
                .map(|j| j.id)
                .collect();
            for id in &pending {
                state.jobs.remove(id);
            }
            Ok(!pending.is_empty())
        }

        async fn find_and_lock_due_jobs(
            &self,
            now: DateTime<Utc>,
            limit: i64,
            lease_secs: i64,
        ) -> Result<Vec<Job>, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let mut due: Vec<&mut Job> = state
                .jobs
                .values_mut()
                .filter(|j| j.is_claimable(now))
                .collect();
            due.sort_by_key(|j| j.run_at);

            Ok(due
                .into_iter()
                .take(limit.max(0) as usize)
                .map(|job| {
                    job.status = JobStatus::Processing;
                    job.attempts += 1;
                    job.locked_until = Some(now + Duration::seconds(lease_secs));
                    job.updated_at = now;
                    job.clone()
                })
                .collect())
        }

        async fn mark_as_completed(
            &self,
            job_id: Uuid,
            claimed_attempts: u32,
            at: DateTime<Utc>,
        ) -> Result<bool, ApplicationError> {
            self.update_claimed(job_id, claimed_attempts, |job| {
                job.status = JobStatus::Completed;
                job.locked_until = None;
                job.finished_at = Some(at);
                job.updated_at = at;
            })
        }

        async fn schedule_retry(
            &self,
            job_id: Uuid,
            claimed_attempts: u32,
            run_at: DateTime<Utc>,
            error_message: &str,
        ) -> Result<bool, ApplicationError> {
            self.update_claimed(job_id, claimed_attempts, |job| {
                job.status = JobStatus::Pending;
                job.run_at = run_at;
                job.locked_until = None;
                job.last_error = Some(error_message.to_string());
            })
        }

        async fn mark_as_failed(
            &self,
            job_id: Uuid,
            claimed_attempts: u32,
            at: DateTime<Utc>,
            error_message: &str,
        ) -> Result<bool, ApplicationError> {
            self.update_claimed(job_id, claimed_attempts, |job| {
                job.status = JobStatus::Failed;
                job.locked_until = None;
                job.last_error = Some(error_message.to_string());
                job.finished_at = Some(at);
                job.updated_at = at;
            })
        }

        async fn prune(
            &self,
            now: DateTime<Utc>,
            completed: &RetentionPolicy,
            failed: &RetentionPolicy,
        ) -> Result<u64, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let pruned = Self::prune_status(&mut state, JobStatus::Completed, completed, now)
                + Self::prune_status(&mut state, JobStatus::Failed, failed, now);
            Ok(pruned)
        }
    }

    /// Transaction over the in-memory store. Holds the store lock for its whole
    /// life and works on a copy that only replaces the store on commit.
    pub struct InMemoryUnitOfWork {
        guard: OwnedMutexGuard<StoreState>,
        working: Shared,
        now: DateTime<Utc>,
        events: EventBuffer,
    }

    #[async_trait]
    impl<'a> UnitOfWork<'a> for InMemoryUnitOfWork {
        fn villages(&self) -> Arc<dyn VillageRepository + 'a> {
            Arc::new(InMemoryVillageRepository {
                state: self.working.clone(),
            })
        }

        fn buildings(&self) -> Arc<dyn BuildingRepository + 'a> {
            Arc::new(InMemoryBuildingRepository {
                state: self.working.clone(),
            })
        }

        fn construction_tasks(&self) -> Arc<dyn ConstructionTaskRepository + 'a> {
            Arc::new(InMemoryConstructionTaskRepository {
                state: self.working.clone(),
            })
        }

        fn troops(&self) -> Arc<dyn TroopRepository + 'a> {
            Arc::new(InMemoryTroopRepository {
                state: self.working.clone(),
            })
        }

        fn training_tasks(&self) -> Arc<dyn TrainingTaskRepository + 'a> {
            Arc::new(InMemoryTrainingTaskRepository {
                state: self.working.clone(),
            })
        }

        fn battles(&self) -> Arc<dyn BattleRepository + 'a> {
            Arc::new(InMemoryBattleRepository {
                state: self.working.clone(),
            })
        }

        fn movements(&self) -> Arc<dyn MovementRepository + 'a> {
            Arc::new(InMemoryMovementRepository {
                state: self.working.clone(),
            })
        }

        fn jobs(&self) -> Arc<dyn JobRepository + 'a> {
            Arc::new(InMemoryJobRepository {
                state: self.working.clone(),
            })
        }

        fn now(&self) -> DateTime<Utc> {
            self.now
        }

        fn events(&self) -> &EventBuffer {
            &self.events
        }

        async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
            let InMemoryUnitOfWork {
                mut guard, working, ..
            } = *self;
            *guard = working.lock().unwrap().clone();
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), ApplicationError> {
            Ok(())
        }
    }

    /// Store shared by every unit of work it begins. Transactions run one at a time.
    #[derive(Clone)]
    pub struct InMemoryUnitOfWorkProvider {
        state: Arc<tokio::sync::Mutex<StoreState>>,
        clock: Arc<MockClock>,
    }

    impl InMemoryUnitOfWorkProvider {
        pub fn new(clock: Arc<MockClock>) -> Self {
            Self {
                state: Arc::new(tokio::sync::Mutex::new(StoreState::default())),
                clock,
            }
        }
    }

    #[async_trait]
    impl UnitOfWorkProvider for InMemoryUnitOfWorkProvider {
        async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError> {
            let guard = self.state.clone().lock_owned().await;
            let working = Arc::new(Mutex::new(guard.clone()));

            Ok(Box::new(InMemoryUnitOfWork {
                guard,
                working,
                now: self.clock.now(),
                events: EventBuffer::default(),
            }))
        }
    }

    /// Seeds a village with default stocks and every building type, at the
    /// given levels or 0.
    pub async fn seed_village(
        provider: &InMemoryUnitOfWorkProvider,
        levels: &[(BuildingName, u8)],
    ) -> Result<Village, ApplicationError> {
        seed_village_with(provider, VillageFactoryOptions::default(), levels).await
    }

    pub async fn seed_village_with(
        provider: &InMemoryUnitOfWorkProvider,
        options: VillageFactoryOptions,
        levels: &[(BuildingName, u8)],
    ) -> Result<Village, ApplicationError> {
        let uow = provider.begin().await?;
        let village = village_factory(VillageFactoryOptions {
            last_collected_at: Some(options.last_collected_at.unwrap_or_else(|| uow.now())),
            ..options
        });
        uow.villages().create(&village).await?;

        let buildings: Vec<Building> = BuildingName::ALL
            .iter()
            .map(|name| {
                let mut building = Building::new(village.id, *name);
                if let Some((_, level)) = levels.iter().find(|(n, _)| n == name) {
                    building.level = *level;
                }
                building
            })
            .collect();
        uow.buildings().create_many(&buildings).await?;
        uow.commit().await?;
        Ok(village)
    }

    /// Adds idle troops to a village.
    pub async fn seed_troops(
        provider: &InMemoryUnitOfWorkProvider,
        village_id: Uuid,
        troops: &[TroopAmount],
    ) -> Result<(), ApplicationError> {
        let uow = provider.begin().await?;
        for entry in troops {
            uow.troops()
                .increment(village_id, entry.troop, TroopStatus::Idle, entry.quantity)
                .await?;
        }
        uow.commit().await
    }

    /// Stores a training task already in progress since now, without scheduling ticks.
    pub async fn seed_running_task(
        provider: &InMemoryUnitOfWorkProvider,
        village_id: Uuid,
        troop: TroopName,
        count: u32,
        unit_time_ms: i64,
    ) -> Result<TrainingTask, ApplicationError> {
        let uow = provider.begin().await?;
        let task = training_task_factory(TrainingTaskFactoryOptions {
            village_id: Some(village_id),
            troop: Some(troop),
            count: Some(count),
            unit_time_ms: Some(unit_time_ms),
            created_at: Some(uow.now()),
            ..Default::default()
        });
        uow.training_tasks().create(&task).await?;
        let started = uow
            .training_tasks()
            .start(task.id, uow.now())
            .await?
            .ok_or_else(|| ApplicationError::Unknown("task did not start".to_string()))?;
        uow.commit().await?;
        Ok(started)
    }

    /// Queues the next upgrade of a building for `duration_ms`, without
    /// paying for it or scheduling the completion job.
    pub async fn queue_upgrade(
        provider: &InMemoryUnitOfWorkProvider,
        village_id: Uuid,
        name: BuildingName,
        duration_ms: i64,
    ) -> Result<Building, ApplicationError> {
        let uow = provider.begin().await?;
        let building = uow
            .buildings()
            .get_by_name(village_id, name)
            .await?
            .ok_or(GameError::BuildingNotFound(name))?;
        let (target_level, cost) = building.next_upgrade()?;
        let until = uow.now() + Duration::milliseconds(duration_ms);

        uow.buildings().mark_queued(building.id, until).await?;
        uow.construction_tasks()
            .create(&ConstructionTask::new(
                village_id,
                building.id,
                name,
                target_level,
                cost.resources,
                uow.now(),
                until,
            ))
            .await?;
        let queued = uow.buildings().get_by_id(building.id).await?;
        uow.commit().await?;
        Ok(queued)
    }
}
