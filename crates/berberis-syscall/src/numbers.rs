//! Per-guest-ISA syscall number tables.
//!
//! `aarch64` and the generic `riscv64` Linux syscall ABI share the same
//! dense numbering (both trace back to `asm-generic/unistd.h`), so they are
//! generated from one table; AAPCS32's legacy EABI numbering is its own
//! table. Ported from the naming convention in
//! `guest_os_primitives/gen_syscall_numbers_riscv64.h`: every entry there is
//! `GUEST_NR_<name> = <number>`, and the host number for `<name>` is
//! whatever `libc::SYS_<name>` resolves to for the host this crate is built
//! for.
//!
//! [`syscall_map!`] builds both directions of one ISA's table from a single
//! list, so the guest->host and host->guest mappings can never drift apart.

macro_rules! syscall_map {
    ($to_host:ident, $to_guest:ident, { $($guest_nr:literal => $host_sym:ident),* $(,)? }) => {
        /// `to_host_syscall_number`: dense switch over the guest numbers
        /// this ISA defines. Anything outside the table returns `-1`.
        pub fn $to_host(guest_nr: i64) -> i64 {
            match guest_nr {
                $($guest_nr => libc::$host_sym as i64,)*
                _ => -1,
            }
        }

        /// Inverse of `$to_host`, used when reporting a host-originated
        /// signal or trace event back in terms of the guest's syscall
        /// numbering.
        pub fn $to_guest(host_nr: i64) -> i64 {
            match host_nr {
                $(x if x == libc::$host_sym as i64 => $guest_nr,)*
                _ => -1,
            }
        }
    };
}

// aarch64 and riscv64 guests: the generic Linux syscall ABI. Covers the
// syscall surface introduced before the 2019 "generic ABI" freeze plus the
// handful of well-established additions up to `rseq`; syscalls added after
// that are not yet wired and correctly fall back to the -1/ENOSYS path.
syscall_map!(generic_to_host, generic_to_guest, {
    0 => SYS_io_setup,
    1 => SYS_io_destroy,
    2 => SYS_io_submit,
    3 => SYS_io_cancel,
    4 => SYS_io_getevents,
    5 => SYS_setxattr,
    6 => SYS_lsetxattr,
    7 => SYS_fsetxattr,
    8 => SYS_getxattr,
    9 => SYS_lgetxattr,
    10 => SYS_fgetxattr,
    11 => SYS_listxattr,
    12 => SYS_llistxattr,
    13 => SYS_flistxattr,
    14 => SYS_removexattr,
    15 => SYS_lremovexattr,
    16 => SYS_fremovexattr,
    17 => SYS_getcwd,
    18 => SYS_lookup_dcookie,
    19 => SYS_eventfd2,
    20 => SYS_epoll_create1,
    21 => SYS_epoll_ctl,
    22 => SYS_epoll_pwait,
    23 => SYS_dup,
    24 => SYS_dup3,
    25 => SYS_fcntl,
    26 => SYS_inotify_init1,
    27 => SYS_inotify_add_watch,
    28 => SYS_inotify_rm_watch,
    29 => SYS_ioctl,
    30 => SYS_ioprio_set,
    31 => SYS_ioprio_get,
    32 => SYS_flock,
    33 => SYS_mknodat,
    34 => SYS_mkdirat,
    35 => SYS_unlinkat,
    36 => SYS_symlinkat,
    37 => SYS_linkat,
    38 => SYS_renameat,
    39 => SYS_umount2,
    40 => SYS_mount,
    41 => SYS_pivot_root,
    42 => SYS_nfsservctl,
    43 => SYS_statfs,
    44 => SYS_fstatfs,
    45 => SYS_truncate,
    46 => SYS_ftruncate,
    47 => SYS_fallocate,
    48 => SYS_faccessat,
    49 => SYS_chdir,
    50 => SYS_fchdir,
    51 => SYS_chroot,
    52 => SYS_fchmod,
    53 => SYS_fchmodat,
    54 => SYS_fchownat,
    55 => SYS_fchown,
    56 => SYS_openat,
    57 => SYS_close,
    58 => SYS_vhangup,
    59 => SYS_pipe2,
    60 => SYS_quotactl,
    61 => SYS_getdents64,
    62 => SYS_lseek,
    63 => SYS_read,
    64 => SYS_write,
    65 => SYS_readv,
    66 => SYS_writev,
    67 => SYS_pread64,
    68 => SYS_pwrite64,
    69 => SYS_preadv,
    70 => SYS_pwritev,
    71 => SYS_sendfile,
    72 => SYS_pselect6,
    73 => SYS_ppoll,
    74 => SYS_signalfd4,
    75 => SYS_vmsplice,
    76 => SYS_splice,
    77 => SYS_tee,
    78 => SYS_readlinkat,
    79 => SYS_newfstatat,
    80 => SYS_fstat,
    81 => SYS_sync,
    82 => SYS_fsync,
    83 => SYS_fdatasync,
    84 => SYS_sync_file_range,
    85 => SYS_timerfd_create,
    86 => SYS_timerfd_settime,
    87 => SYS_timerfd_gettime,
    88 => SYS_utimensat,
    89 => SYS_acct,
    90 => SYS_capget,
    91 => SYS_capset,
    92 => SYS_personality,
    93 => SYS_exit,
    94 => SYS_exit_group,
    95 => SYS_waitid,
    96 => SYS_set_tid_address,
    97 => SYS_unshare,
    98 => SYS_futex,
    99 => SYS_set_robust_list,
    100 => SYS_get_robust_list,
    101 => SYS_nanosleep,
    102 => SYS_getitimer,
    103 => SYS_setitimer,
    104 => SYS_kexec_load,
    105 => SYS_init_module,
    106 => SYS_delete_module,
    107 => SYS_timer_create,
    108 => SYS_timer_gettime,
    109 => SYS_timer_getoverrun,
    110 => SYS_timer_settime,
    111 => SYS_timer_delete,
    112 => SYS_clock_settime,
    113 => SYS_clock_gettime,
    114 => SYS_clock_getres,
    115 => SYS_clock_nanosleep,
    116 => SYS_syslog,
    117 => SYS_ptrace,
    118 => SYS_sched_setparam,
    119 => SYS_sched_setscheduler,
    120 => SYS_sched_getscheduler,
    121 => SYS_sched_getparam,
    122 => SYS_sched_setaffinity,
    123 => SYS_sched_getaffinity,
    124 => SYS_sched_yield,
    125 => SYS_sched_get_priority_max,
    126 => SYS_sched_get_priority_min,
    127 => SYS_sched_rr_get_interval,
    128 => SYS_restart_syscall,
    129 => SYS_kill,
    130 => SYS_tkill,
    131 => SYS_tgkill,
    132 => SYS_sigaltstack,
    133 => SYS_rt_sigsuspend,
    134 => SYS_rt_sigaction,
    135 => SYS_rt_sigprocmask,
    136 => SYS_rt_sigpending,
    137 => SYS_rt_sigtimedwait,
    138 => SYS_rt_sigqueueinfo,
    139 => SYS_rt_sigreturn,
    140 => SYS_setpriority,
    141 => SYS_getpriority,
    142 => SYS_reboot,
    143 => SYS_setregid,
    144 => SYS_setgid,
    145 => SYS_setreuid,
    146 => SYS_setuid,
    147 => SYS_setresuid,
    148 => SYS_getresuid,
    149 => SYS_setresgid,
    150 => SYS_getresgid,
    151 => SYS_setfsuid,
    152 => SYS_setfsgid,
    153 => SYS_times,
    154 => SYS_setpgid,
    155 => SYS_getpgid,
    156 => SYS_getsid,
    157 => SYS_setsid,
    158 => SYS_getgroups,
    159 => SYS_setgroups,
    160 => SYS_uname,
    161 => SYS_sethostname,
    162 => SYS_setdomainname,
    163 => SYS_getrlimit,
    164 => SYS_setrlimit,
    165 => SYS_getrusage,
    166 => SYS_umask,
    167 => SYS_prctl,
    168 => SYS_getcpu,
    169 => SYS_gettimeofday,
    170 => SYS_settimeofday,
    171 => SYS_adjtimex,
    172 => SYS_getpid,
    173 => SYS_getppid,
    174 => SYS_getuid,
    175 => SYS_geteuid,
    176 => SYS_getgid,
    177 => SYS_getegid,
    178 => SYS_gettid,
    179 => SYS_sysinfo,
    180 => SYS_mq_open,
    181 => SYS_mq_unlink,
    182 => SYS_mq_timedsend,
    183 => SYS_mq_timedreceive,
    184 => SYS_mq_notify,
    185 => SYS_mq_getsetattr,
    186 => SYS_msgget,
    187 => SYS_msgctl,
    188 => SYS_msgrcv,
    189 => SYS_msgsnd,
    190 => SYS_semget,
    191 => SYS_semctl,
    192 => SYS_semtimedop,
    193 => SYS_semop,
    194 => SYS_shmget,
    195 => SYS_shmctl,
    196 => SYS_shmat,
    197 => SYS_shmdt,
    198 => SYS_socket,
    199 => SYS_socketpair,
    200 => SYS_bind,
    201 => SYS_listen,
    202 => SYS_accept,
    203 => SYS_connect,
    204 => SYS_getsockname,
    205 => SYS_getpeername,
    206 => SYS_sendto,
    207 => SYS_recvfrom,
    208 => SYS_setsockopt,
    209 => SYS_getsockopt,
    210 => SYS_shutdown,
    211 => SYS_sendmsg,
    212 => SYS_recvmsg,
    213 => SYS_readahead,
    214 => SYS_brk,
    215 => SYS_munmap,
    216 => SYS_mremap,
    217 => SYS_add_key,
    218 => SYS_request_key,
    219 => SYS_keyctl,
    220 => SYS_clone,
    221 => SYS_execve,
    222 => SYS_mmap,
    223 => SYS_fadvise64,
    224 => SYS_swapon,
    225 => SYS_swapoff,
    226 => SYS_mprotect,
    227 => SYS_msync,
    228 => SYS_mlock,
    229 => SYS_munlock,
    230 => SYS_mlockall,
    231 => SYS_munlockall,
    232 => SYS_mincore,
    233 => SYS_madvise,
    234 => SYS_remap_file_pages,
    235 => SYS_mbind,
    236 => SYS_get_mempolicy,
    237 => SYS_set_mempolicy,
    238 => SYS_migrate_pages,
    239 => SYS_move_pages,
    240 => SYS_rt_tgsigqueueinfo,
    241 => SYS_perf_event_open,
    242 => SYS_accept4,
    243 => SYS_recvmmsg,
    260 => SYS_wait4,
    261 => SYS_prlimit64,
    262 => SYS_fanotify_init,
    263 => SYS_fanotify_mark,
    264 => SYS_name_to_handle_at,
    265 => SYS_open_by_handle_at,
    266 => SYS_clock_adjtime,
    267 => SYS_syncfs,
    268 => SYS_setns,
    269 => SYS_sendmmsg,
    270 => SYS_process_vm_readv,
    271 => SYS_process_vm_writev,
    272 => SYS_kcmp,
    273 => SYS_finit_module,
    274 => SYS_sched_setattr,
    275 => SYS_sched_getattr,
    276 => SYS_renameat2,
    277 => SYS_seccomp,
    278 => SYS_getrandom,
    279 => SYS_memfd_create,
    280 => SYS_bpf,
    281 => SYS_execveat,
    282 => SYS_userfaultfd,
    283 => SYS_membarrier,
    284 => SYS_mlock2,
    285 => SYS_copy_file_range,
    286 => SYS_preadv2,
    287 => SYS_pwritev2,
    288 => SYS_pkey_mprotect,
    289 => SYS_pkey_alloc,
    290 => SYS_pkey_free,
    291 => SYS_statx,
    292 => SYS_io_pgetevents,
    293 => SYS_rseq,
});

// AAPCS32 (ARM EABI) guests: the legacy direct-syscall numbering. Obsolete
// pre-EABI multiplexed calls (`socketcall`, `ipc`, `select` via `_newselect`
// only) and the handful of signal syscalls whose libc bindings are
// arch-conditional are left out of the table; they fall back to -1/ENOSYS
// like any other guest_nr this table doesn't recognize.
syscall_map!(arm32_to_host, arm32_to_guest, {
    1 => SYS_exit,
    2 => SYS_fork,
    3 => SYS_read,
    4 => SYS_write,
    5 => SYS_open,
    6 => SYS_close,
    9 => SYS_link,
    10 => SYS_unlink,
    11 => SYS_execve,
    12 => SYS_chdir,
    14 => SYS_mknod,
    15 => SYS_chmod,
    16 => SYS_lchown,
    19 => SYS_lseek,
    20 => SYS_getpid,
    21 => SYS_mount,
    22 => SYS_umount,
    23 => SYS_setuid,
    24 => SYS_getuid,
    26 => SYS_ptrace,
    27 => SYS_alarm,
    29 => SYS_pause,
    30 => SYS_utime,
    33 => SYS_access,
    34 => SYS_nice,
    36 => SYS_sync,
    37 => SYS_kill,
    38 => SYS_rename,
    39 => SYS_mkdir,
    40 => SYS_rmdir,
    41 => SYS_dup,
    42 => SYS_pipe,
    43 => SYS_times,
    45 => SYS_brk,
    46 => SYS_setgid,
    47 => SYS_getgid,
    49 => SYS_geteuid,
    50 => SYS_getegid,
    51 => SYS_acct,
    52 => SYS_umount2,
    54 => SYS_ioctl,
    55 => SYS_fcntl,
    57 => SYS_setpgid,
    60 => SYS_umask,
    61 => SYS_chroot,
    62 => SYS_ustat,
    63 => SYS_dup2,
    64 => SYS_getppid,
    65 => SYS_getpgrp,
    66 => SYS_setsid,
    70 => SYS_setreuid,
    71 => SYS_setregid,
    74 => SYS_sethostname,
    75 => SYS_setrlimit,
    76 => SYS_getrlimit,
    77 => SYS_getrusage,
    78 => SYS_gettimeofday,
    79 => SYS_settimeofday,
    80 => SYS_getgroups,
    81 => SYS_setgroups,
    82 => SYS_select,
    83 => SYS_symlink,
    85 => SYS_readlink,
    87 => SYS_swapon,
    88 => SYS_reboot,
    90 => SYS_mmap,
    91 => SYS_munmap,
    92 => SYS_truncate,
    93 => SYS_ftruncate,
    94 => SYS_fchmod,
    95 => SYS_fchown,
    96 => SYS_getpriority,
    97 => SYS_setpriority,
    99 => SYS_statfs,
    100 => SYS_fstatfs,
    103 => SYS_syslog,
    104 => SYS_setitimer,
    105 => SYS_getitimer,
    106 => SYS_stat,
    107 => SYS_lstat,
    108 => SYS_fstat,
    111 => SYS_vhangup,
    114 => SYS_wait4,
    115 => SYS_swapoff,
    116 => SYS_sysinfo,
    118 => SYS_fsync,
    120 => SYS_clone,
    121 => SYS_setdomainname,
    122 => SYS_uname,
    125 => SYS_mprotect,
    128 => SYS_init_module,
    129 => SYS_delete_module,
    133 => SYS_fchdir,
    138 => SYS_setfsuid,
    139 => SYS_setfsgid,
    141 => SYS_getdents,
    143 => SYS_flock,
    144 => SYS_msync,
    145 => SYS_readv,
    146 => SYS_writev,
    147 => SYS_getsid,
    148 => SYS_fdatasync,
    150 => SYS_mlock,
    151 => SYS_munlock,
    152 => SYS_mlockall,
    153 => SYS_munlockall,
    154 => SYS_sched_setparam,
    155 => SYS_sched_getparam,
    156 => SYS_sched_setscheduler,
    157 => SYS_sched_getscheduler,
    158 => SYS_sched_yield,
    159 => SYS_sched_get_priority_max,
    160 => SYS_sched_get_priority_min,
    161 => SYS_sched_rr_get_interval,
    162 => SYS_nanosleep,
    163 => SYS_mremap,
    164 => SYS_setresuid,
    165 => SYS_getresuid,
    168 => SYS_poll,
    169 => SYS_nfsservctl,
    172 => SYS_prctl,
    173 => SYS_rt_sigreturn,
    174 => SYS_rt_sigaction,
    175 => SYS_rt_sigprocmask,
    176 => SYS_rt_sigpending,
    177 => SYS_rt_sigtimedwait,
    178 => SYS_rt_sigqueueinfo,
    179 => SYS_rt_sigsuspend,
    180 => SYS_pread64,
    181 => SYS_pwrite64,
    182 => SYS_chown,
    183 => SYS_getcwd,
    184 => SYS_capget,
    185 => SYS_capset,
    186 => SYS_sigaltstack,
    187 => SYS_sendfile,
    190 => SYS_vfork,
    192 => SYS_mmap2,
    193 => SYS_truncate64,
    194 => SYS_ftruncate64,
    195 => SYS_stat64,
    196 => SYS_lstat64,
    197 => SYS_fstat64,
    198 => SYS_lchown32,
    199 => SYS_getuid32,
    200 => SYS_getgid32,
    201 => SYS_geteuid32,
    202 => SYS_getegid32,
    203 => SYS_setreuid32,
    204 => SYS_setregid32,
    205 => SYS_getgroups32,
    206 => SYS_setgroups32,
    207 => SYS_fchown32,
    208 => SYS_setresuid32,
    209 => SYS_getresuid32,
    210 => SYS_setresgid32,
    211 => SYS_getresgid32,
    212 => SYS_chown32,
    213 => SYS_setuid32,
    214 => SYS_setgid32,
    215 => SYS_setfsuid32,
    216 => SYS_setfsgid32,
    217 => SYS_getdents64,
    218 => SYS_pivot_root,
    219 => SYS_mincore,
    220 => SYS_madvise,
    221 => SYS_fcntl64,
    224 => SYS_gettid,
    225 => SYS_readahead,
    226 => SYS_setxattr,
    227 => SYS_lsetxattr,
    228 => SYS_fsetxattr,
    229 => SYS_getxattr,
    230 => SYS_lgetxattr,
    231 => SYS_fgetxattr,
    232 => SYS_listxattr,
    233 => SYS_llistxattr,
    234 => SYS_flistxattr,
    235 => SYS_tkill,
    236 => SYS_sendfile64,
    237 => SYS_futex,
    238 => SYS_sched_setaffinity,
    239 => SYS_sched_getaffinity,
    240 => SYS_io_setup,
    241 => SYS_io_destroy,
    242 => SYS_io_getevents,
    243 => SYS_io_submit,
    244 => SYS_io_cancel,
    245 => SYS_exit_group,
    246 => SYS_lookup_dcookie,
    247 => SYS_epoll_create,
    248 => SYS_epoll_ctl,
    249 => SYS_epoll_wait,
    250 => SYS_remap_file_pages,
    252 => SYS_set_tid_address,
    253 => SYS_timer_create,
    254 => SYS_timer_settime,
    255 => SYS_timer_gettime,
    256 => SYS_timer_getoverrun,
    257 => SYS_timer_delete,
    258 => SYS_clock_settime,
    259 => SYS_clock_gettime,
    260 => SYS_clock_getres,
    261 => SYS_clock_nanosleep,
    262 => SYS_statfs64,
    263 => SYS_fstatfs64,
    264 => SYS_tgkill,
    265 => SYS_utimes,
    266 => SYS_fadvise64_64,
    268 => SYS_mbind,
    269 => SYS_get_mempolicy,
    270 => SYS_set_mempolicy,
    271 => SYS_mq_open,
    272 => SYS_mq_unlink,
    273 => SYS_mq_timedsend,
    274 => SYS_mq_timedreceive,
    275 => SYS_mq_notify,
    276 => SYS_mq_getsetattr,
    277 => SYS_waitid,
    278 => SYS_socket,
    279 => SYS_bind,
    280 => SYS_connect,
    281 => SYS_listen,
    282 => SYS_accept,
    283 => SYS_getsockname,
    284 => SYS_getpeername,
    285 => SYS_socketpair,
    287 => SYS_sendto,
    289 => SYS_recvfrom,
    290 => SYS_shutdown,
    291 => SYS_setsockopt,
    292 => SYS_getsockopt,
    293 => SYS_sendmsg,
    294 => SYS_recvmsg,
    295 => SYS_semop,
    296 => SYS_semget,
    297 => SYS_semctl,
    298 => SYS_msgsnd,
    299 => SYS_msgrcv,
    300 => SYS_msgget,
    301 => SYS_msgctl,
    302 => SYS_shmat,
    303 => SYS_shmdt,
    304 => SYS_shmget,
    305 => SYS_shmctl,
    306 => SYS_add_key,
    307 => SYS_request_key,
    308 => SYS_keyctl,
    309 => SYS_semtimedop,
    311 => SYS_ioprio_set,
    312 => SYS_ioprio_get,
    313 => SYS_inotify_init,
    314 => SYS_inotify_add_watch,
    315 => SYS_inotify_rm_watch,
    317 => SYS_openat,
    318 => SYS_mkdirat,
    319 => SYS_mknodat,
    320 => SYS_fchownat,
    321 => SYS_futimesat,
    322 => SYS_fstatat64,
    323 => SYS_unlinkat,
    324 => SYS_renameat,
    325 => SYS_linkat,
    326 => SYS_symlinkat,
    327 => SYS_readlinkat,
    328 => SYS_fchmodat,
    329 => SYS_faccessat,
    330 => SYS_pselect6,
    331 => SYS_ppoll,
    332 => SYS_unshare,
    333 => SYS_set_robust_list,
    334 => SYS_get_robust_list,
    335 => SYS_splice,
    336 => SYS_sync_file_range2,
    337 => SYS_tee,
    338 => SYS_vmsplice,
    339 => SYS_move_pages,
    340 => SYS_getcpu,
    341 => SYS_epoll_pwait,
    342 => SYS_kexec_load,
    343 => SYS_utimensat,
    344 => SYS_signalfd,
    345 => SYS_timerfd_create,
    346 => SYS_eventfd,
    347 => SYS_fallocate,
    348 => SYS_timerfd_settime,
    349 => SYS_timerfd_gettime,
    350 => SYS_signalfd4,
    351 => SYS_eventfd2,
    352 => SYS_epoll_create1,
    353 => SYS_dup3,
    354 => SYS_pipe2,
    355 => SYS_inotify_init1,
    356 => SYS_preadv,
    357 => SYS_pwritev,
    358 => SYS_rt_tgsigqueueinfo,
    359 => SYS_perf_event_open,
    360 => SYS_recvmmsg,
    361 => SYS_accept4,
    362 => SYS_fanotify_init,
    363 => SYS_fanotify_mark,
    364 => SYS_prlimit64,
    365 => SYS_name_to_handle_at,
    366 => SYS_open_by_handle_at,
    367 => SYS_clock_adjtime,
    368 => SYS_syncfs,
    369 => SYS_sendmmsg,
    370 => SYS_setns,
    371 => SYS_process_vm_readv,
    372 => SYS_process_vm_writev,
    373 => SYS_kcmp,
    374 => SYS_finit_module,
    375 => SYS_sched_setattr,
    376 => SYS_sched_getattr,
    377 => SYS_renameat2,
    378 => SYS_seccomp,
    379 => SYS_getrandom,
    380 => SYS_memfd_create,
    381 => SYS_bpf,
    382 => SYS_execveat,
    383 => SYS_userfaultfd,
    384 => SYS_membarrier,
    385 => SYS_mlock2,
    386 => SYS_copy_file_range,
    387 => SYS_preadv2,
    388 => SYS_pwritev2,
});
