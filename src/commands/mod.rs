mod dry_run;

pub(crate) use dry_run::dry_run;
