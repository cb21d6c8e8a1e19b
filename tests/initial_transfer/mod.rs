mod current_state_case1;
