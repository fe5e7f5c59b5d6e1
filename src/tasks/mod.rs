pub mod topic_poller;
